pub mod documents;
pub mod facet;
pub mod query;
pub mod request_params;
pub mod response;
