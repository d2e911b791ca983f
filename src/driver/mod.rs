pub mod http;
pub mod traits;
pub mod web;

pub use traits::{
    AdapterFactory, BrowserSession, DefaultAdapterFactory, ElementInfo, FormSubmission,
    HttpRequest, HttpResponse, Locator, Navigation, TargetAdapter,
};
