use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::HandlerError;

pub(crate) type BoxedHandler = Box<
    dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value, HandlerError>> + Send>>
        + Send
        + Sync,
>;

pub(crate) fn box_handler<F, Fut>(handler: F) -> BoxedHandler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    Box::new(move |params| Box::pin(handler(params)))
}
