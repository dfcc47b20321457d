pub mod request_id;

pub use request_id::{request_id_middleware, span_for_request, RequestId, REQUEST_ID_HEADER};
