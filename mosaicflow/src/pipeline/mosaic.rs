//! Mosaic pipeline assembly.
//!
//! Each instance is the chain warp → build-overviews → transfer → register
//! for one dataset index. Instances are independent of each other.

use super::{PipelineInstance, StageSpec, SubWorkflow};
use crate::config::MosaicConfig;
use crate::core::StageKind;
use crate::errors::{ConfigurationError, MosaicflowError};
use tracing::debug;

/// Builds `instance_count` independent mosaic pipeline instances.
///
/// Nothing is executed; the result only describes the stages.
///
/// # Errors
///
/// Returns `ConfigurationError` if `instance_count < 1` or the shared
/// configuration is missing a required value.
pub fn build_mosaic_pipeline(
    instance_count: i64,
    config: &MosaicConfig,
) -> Result<Vec<PipelineInstance>, ConfigurationError> {
    let count = u32::try_from(instance_count)
        .ok()
        .filter(|c| *c >= 1)
        .ok_or_else(|| {
            ConfigurationError::out_of_range(
                "instance_count",
                format!("instance_count must be >= 1, got {instance_count}"),
            )
        })?;
    config.validate()?;

    let instances: Vec<PipelineInstance> = (1..=count).map(|index| mosaic_instance(index, config)).collect();
    debug!(instances = count, stages = u64::from(count) * 4, "Assembled mosaic pipeline");
    Ok(instances)
}

/// Assembles the instances into the `parent.child` sub-workflow.
///
/// # Errors
///
/// Returns `ConfigurationError` for bad parameters.
pub fn mosaic_subworkflow(
    parent: &str,
    child: &str,
    instance_count: i64,
    config: &MosaicConfig,
) -> Result<SubWorkflow, MosaicflowError> {
    let instances = build_mosaic_pipeline(instance_count, config)?;
    let stages = instances.into_iter().flat_map(|instance| instance.stages);
    Ok(SubWorkflow::from_stages(parent, child, stages)?)
}

fn mosaic_instance(index: u32, config: &MosaicConfig) -> PipelineInstance {
    PipelineInstance::chain(
        index,
        StageKind::MOSAIC_CHAIN.map(|kind| with_kind_params(indexed(kind, index), config)),
    )
}

fn with_kind_params(spec: StageSpec, config: &MosaicConfig) -> StageSpec {
    match spec.kind {
        StageKind::Warp => {
            let warp = &config.warp;
            spec.with_param("target_srs", warp.target_srs.as_str())
                .with_param("tile_size", warp.tile_size)
                .with_param("working_dir", warp.working_dir.as_str())
                .with_param("overwrite", warp.overwrite)
        }
        StageKind::BuildOverviews => {
            let overviews = &config.overviews;
            spec.with_param("resampling_method", overviews.resampling_method.as_str())
                .with_param("max_overview_level", overviews.max_overview_level)
        }
        StageKind::Transfer => {
            let transfer = &config.transfer;
            spec.with_param("host", transfer.host.as_str())
                .with_param("remote_usr", transfer.remote_user.as_str())
                .with_param("ssh_key_file", transfer.ssh_key_file.as_str())
                .with_param("remote_dir", transfer.remote_dir.as_str())
                .with_param("working_dir", transfer.working_dir.as_str())
        }
        StageKind::Register => {
            let register = &config.register;
            spec.with_param("geoserver_rest_url", register.rest_url.as_str())
                .with_param("gs_user", register.user.as_str())
                .with_param("gs_password", register.password.expose())
                .with_param("imagemosaic_storename", register.store_name.as_str())
                .with_param("mosaic_path", register.mosaic_path.as_str())
        }
        StageKind::Push | StageKind::Search | StageKind::Download => spec,
    }
}

fn indexed(kind: StageKind, index: u32) -> StageSpec {
    StageSpec::new(kind.task_name(index), kind)
        .with_index(index)
        .with_param("index", index)
}
