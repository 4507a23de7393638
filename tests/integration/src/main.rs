mod helpers;

mod concurrency;
mod failover;
mod identity;
mod properties;
