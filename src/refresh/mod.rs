pub mod dispatcher;
pub mod router;

pub use dispatcher::RefreshDispatcher;
pub use router::ResultRouter;
