/// 数据采集模块
pub mod github;
pub mod routes;

pub use github::{GithubEvent, GithubIngestor, GithubWebhooksRepo};
