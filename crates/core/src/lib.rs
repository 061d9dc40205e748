pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod submission;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::lead::{
    BudgetTier, LeadId, PersonalInfo, PersonalInfoPatch, SharedFields, SharedFieldsPatch,
};
pub use domain::service::{ServiceKind, ServicePayload, SubFormReport};
pub use domain::session::{SessionId, SubmissionState, WizardMode, WizardSession};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{
    LeadWizard, Navigation, Progress, SelectionChange, ServiceDataSnapshot, StepCatalog, StepId,
    StepSequencer, StepValidator, WizardHandle,
};
pub use submission::{
    ClientContext, InMemoryLeadsGateway, LeadReceipt, LeadSubmission, LeadsGateway,
    SubmissionCoordinator, SubmissionOutcome,
};
