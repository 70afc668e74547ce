pub mod lifecycle;
pub mod logs;
pub mod mapping;
pub mod provider;
pub mod reconciler;
pub mod throttle;
pub mod translator;
pub mod wait;

pub use lifecycle::LifecycleManager;
pub use logs::LogRetriever;
pub use mapping::{IdentityMapping, TrackedTask};
pub use provider::Provider;
pub use reconciler::StatusReconciler;
pub use throttle::ApiThrottle;
pub use translator::{translate, TaskPlan, TranslatorContext};
pub use wait::{wait_for_phase, WaitOptions};
