pub mod dispatcher;
pub mod messaging;
pub mod metrics;
pub mod providers;

pub use dispatcher::{BatchDispatcher, DispatchError};
pub use messaging::initialize;
pub use metrics::{get_metrics, init_metrics, record_batch};
pub use providers::{
    FcmProvider, MockPushProvider, ProviderError, PushMessage, PushProvider, ServiceAccount,
};
