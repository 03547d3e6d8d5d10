pub mod approval;
pub mod request;
