//! Resource provisioning with idempotent setup and exhaustive cleanup.

use super::{FileStoreAdmin, QueueAdmin, ResourceKind, ResourceSet, TableAdmin};
use crate::context::TestContext;
use crate::errors::{AdminError, ResourceCleanupError, ResourceCreationError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Creates and deletes the external resources of a test run.
#[derive(Clone)]
pub struct ResourceProvisioner {
    queues: Arc<dyn QueueAdmin>,
    tables: Arc<dyn TableAdmin>,
    files: Arc<dyn FileStoreAdmin>,
}

impl std::fmt::Debug for ResourceProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceProvisioner").finish_non_exhaustive()
    }
}

impl ResourceProvisioner {
    /// Creates a provisioner over the given admin clients.
    #[must_use]
    pub fn new(
        queues: Arc<dyn QueueAdmin>,
        tables: Arc<dyn TableAdmin>,
        files: Arc<dyn FileStoreAdmin>,
    ) -> Self {
        Self {
            queues,
            tables,
            files,
        }
    }

    /// Creates every resource that does not exist yet, in order.
    ///
    /// Directories are only recorded; the file sink creates them on first write.
    ///
    /// # Errors
    ///
    /// Returns the first creation failure other than "already exists".
    pub async fn setup(
        &self,
        ctx: &TestContext,
        resources: &ResourceSet,
    ) -> Result<(), ResourceCreationError> {
        for resource in resources {
            let result = match resource.kind {
                ResourceKind::Queue => self.queues.create_topic(&resource.name).await,
                ResourceKind::Table => match resource.column_family() {
                    Some(cf) => self.tables.create_table(&resource.name, cf).await,
                    None => Err(AdminError::Rejected("missing column family".to_string())),
                },
                ResourceKind::Directory => Ok(()),
            };

            match result {
                Ok(()) => {
                    info!(
                        run_id = %ctx.run_id(),
                        kind = %resource.kind,
                        name = %resource.name,
                        "Provisioned resource"
                    );
                }
                Err(AdminError::AlreadyExists) => {
                    debug!(
                        run_id = %ctx.run_id(),
                        kind = %resource.kind,
                        name = %resource.name,
                        "Resource already exists"
                    );
                }
                Err(source) => {
                    return Err(ResourceCreationError::new(
                        resource.kind,
                        &resource.name,
                        source,
                    ));
                }
            }
        }

        Ok(())
    }

    /// Deletes every resource in reverse provisioning order.
    ///
    /// Never stops early: each failure is logged, collected and the next
    /// resource is attempted. A resource that is already gone counts as
    /// cleaned. All directories go out in one batch, at the position of the
    /// last-provisioned directory.
    pub async fn cleanup(
        &self,
        ctx: &TestContext,
        resources: &ResourceSet,
    ) -> Vec<ResourceCleanupError> {
        let mut errors = Vec::new();
        let mut directories_done = false;

        for resource in resources.iter().rev() {
            match resource.kind {
                ResourceKind::Queue => {
                    let result = self.queues.delete_topic(&resource.name).await;
                    record(ctx, resource.kind, &resource.name, result, &mut errors);
                }
                ResourceKind::Table => {
                    let result = self.tables.delete_table(&resource.name).await;
                    record(ctx, resource.kind, &resource.name, result, &mut errors);
                }
                ResourceKind::Directory if !directories_done => {
                    directories_done = true;
                    let paths: Vec<String> = resources
                        .of_kind(ResourceKind::Directory)
                        .map(|r| r.name.clone())
                        .collect();
                    match self.files.delete_directories(&paths).await {
                        Ok(()) | Err(AdminError::NotFound) => {
                            info!(run_id = %ctx.run_id(), paths = ?paths, "Deleted directories");
                        }
                        Err(source) => {
                            for path in paths {
                                let err = ResourceCleanupError::new(
                                    ResourceKind::Directory,
                                    path,
                                    source.clone(),
                                );
                                warn!(run_id = %ctx.run_id(), error = %err, "Cleanup failed");
                                errors.push(err);
                            }
                        }
                    }
                }
                ResourceKind::Directory => {}
            }
        }

        errors
    }
}

fn record(
    ctx: &TestContext,
    kind: ResourceKind,
    name: &str,
    result: Result<(), AdminError>,
    errors: &mut Vec<ResourceCleanupError>,
) {
    match result {
        Ok(()) => {
            info!(run_id = %ctx.run_id(), kind = %kind, name = %name, "Deleted resource");
        }
        Err(AdminError::NotFound) => {
            debug!(run_id = %ctx.run_id(), kind = %kind, name = %name, "Resource already gone");
        }
        Err(source) => {
            let err = ResourceCleanupError::new(kind, name, source);
            warn!(run_id = %ctx.run_id(), error = %err, "Cleanup failed");
            errors.push(err);
        }
    }
}
