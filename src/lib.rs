/*!
# Overview
s3rb-rs decommissions Amazon S3 versioned buckets safely.
It suspends versioning, purges every object version and delete marker,
deletes the bucket, and confirms the deletion actually took effect.

## Features
- **Versioning Aware**: Suspends versioning before purging and waits for
  the configuration to converge
- **Complete Purge**: Drains both the versioned catalog and the
  plain-object catalog before deleting the bucket
- **Idempotent**: Rerunning against an already-absent bucket reports an
  unchanged result; already-deleted objects and buckets are success
- **Bounded Waits**: Every wait (versioning convergence, deletion
  confirmation) runs on a fixed schedule and fails rather than hangs
- **Library-First**: The whole workflow is a Rust library with an
  injectable storage seam

Example usage
=============

```toml
[dependencies]
s3rb-rs = "0.1"
tokio = { version = "1", features = ["full"] }
```

```no_run
use s3rb_rs::config::Config;
use s3rb_rs::types::token::create_workflow_cancellation_token;
use s3rb_rs::workflow::DecommissionWorkflow;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = Config::for_bucket("my-old-bucket");
    config.force = true;

    let cancellation_token = create_workflow_cancellation_token();
    let workflow = DecommissionWorkflow::new(config, cancellation_token).await?;
    let result = workflow.run().await?;

    println!("changed: {}, purged: {}", result.changed, result.purged.total());
    Ok(())
}
```
*/

pub mod config;
pub mod enumerator;
pub mod poll;
pub mod purger;
pub mod retry;
pub mod stage;
pub mod storage;
pub mod types;
pub mod versioning;
pub mod waiter;
pub mod workflow;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use types::token::create_workflow_cancellation_token;
pub use types::{DecommissionResult, PurgeSummary};
pub use workflow::{DecommissionWorkflow, decommission_bucket};
