// JSON envelopes rendered for the transport layer
pub mod response;

pub use response::{
    Response, collection_response, deleted_response, error_response, list_response, record_response,
    respond,
};
