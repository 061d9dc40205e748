pub mod aggregator;
pub mod catalog;
pub mod engine;
pub mod sequencer;
pub mod states;
pub mod validator;

pub use aggregator::{ServiceDataAggregator, ServiceDataSnapshot};
pub use catalog::{StepCatalog, StepCategory, StepEntry, StepId};
pub use engine::{LeadWizard, WizardHandle};
pub use sequencer::{Reconciliation, StepSequencer};
pub use states::{Navigation, Progress, SelectionChange};
pub use validator::{is_valid_email, StepValidator};
