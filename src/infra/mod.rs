pub mod bitbucket;
pub mod github;
pub mod http;
pub mod oauth;
pub mod service_now;
