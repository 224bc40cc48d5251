pub mod analyzer;
pub mod job_client;
pub mod job_store;
pub mod poller;
