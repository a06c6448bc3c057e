//! # Dependency injection
//!
//! Builds the `ek-infra` and `ek-platform` adapters, injects them into the
//! `ek-core` services and hands back a ready [`KernelRuntime`].
//!
//! Assembly only: configuration was loaded in `config.rs`, and no decision
//! about what the kernel does is taken here.

use std::sync::Arc;

use ek_core::clipboard::{ClipboardCoordinator, ClipboardPorts};
use ek_core::config::KernelConfig;
use ek_core::file::FileSystem;
use ek_core::ports::{
    ClockPort, GdiObjectPort, GlobalMemoryPort, NativeFsPort, PathResolverPort, TextCodecPort,
};
use ek_infra::{CodePageCodec, DosPathResolver, InMemoryGlobalHeap, StdNativeFs, SystemClock};
use ek_platform::{NullGdi, SelectionConnection, SelectionDisplay, WindowManager};

use crate::kernel::Kernel;

/// Result type for wiring operations
pub type WiringResult<T> = Result<T, WiringError>;

/// Errors during dependency injection
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("Drive {drive}: root initialization failed: {source}")]
    DriveInit {
        drive: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Current directory is invalid: {0}")]
    CurrentDir(String),
}

/// Adapters that run on the host directly.
struct InfraLayer {
    paths: Arc<dyn PathResolverPort>,
    native: Arc<dyn NativeFsPort>,
    clock: Arc<dyn ClockPort>,
    heap: Arc<InMemoryGlobalHeap>,
    codec: Arc<dyn TextCodecPort>,
}

/// Windowing side: window tree, selection connection and graphics.
struct PlatformLayer {
    windows: Arc<WindowManager>,
    display: SelectionDisplay,
    selection: Arc<SelectionConnection>,
    gdi: Arc<dyn GdiObjectPort>,
}

/// A wired kernel session with the platform objects the embedder drives.
pub struct KernelRuntime {
    pub kernel: Kernel,
    pub windows: Arc<WindowManager>,
    pub display: SelectionDisplay,
    pub selection: Arc<SelectionConnection>,
    pub heap: Arc<InMemoryGlobalHeap>,
}

fn ensure_drive_roots(config: &KernelConfig) -> WiringResult<()> {
    for (drive, root) in &config.drives {
        if root.is_dir() {
            continue;
        }
        tracing::info!(drive = %drive, root = %root.display(), "creating drive root");
        std::fs::create_dir_all(root).map_err(|source| WiringError::DriveInit {
            drive: drive.clone(),
            source,
        })?;
    }
    Ok(())
}

fn create_infra_layer(config: &KernelConfig, current_dir: Option<&str>) -> WiringResult<InfraLayer> {
    let mut resolver = DosPathResolver::new(config);
    if let Some(dir) = current_dir {
        resolver = resolver
            .with_current_dir(dir)
            .map_err(|err| WiringError::CurrentDir(format!("{dir}: {err}")))?;
    }
    Ok(InfraLayer {
        paths: Arc::new(resolver),
        native: Arc::new(StdNativeFs::new()),
        clock: Arc::new(SystemClock),
        heap: Arc::new(InMemoryGlobalHeap::new()),
        codec: Arc::new(CodePageCodec::new()),
    })
}

fn create_platform_layer(display: SelectionDisplay) -> PlatformLayer {
    let selection = Arc::new(display.connect());
    PlatformLayer {
        windows: Arc::new(WindowManager::new()),
        display,
        selection,
        gdi: Arc::new(NullGdi),
    }
}

/// Wire a kernel session on its own selection display.
pub fn wire_kernel(config: &KernelConfig) -> WiringResult<KernelRuntime> {
    wire_kernel_on(config, SelectionDisplay::new(), None)
}

/// Wire a kernel session as a client of `display`, optionally starting in
/// the emulated directory `current_dir`.
pub fn wire_kernel_on(
    config: &KernelConfig,
    display: SelectionDisplay,
    current_dir: Option<&str>,
) -> WiringResult<KernelRuntime> {
    ensure_drive_roots(config)?;
    let infra = create_infra_layer(config, current_dir)?;
    let platform = create_platform_layer(display);

    let files = FileSystem::new(infra.paths, infra.native, infra.clock, &config.files);
    let memory: Arc<dyn GlobalMemoryPort> = infra.heap.clone();
    let clipboard = ClipboardCoordinator::new(ClipboardPorts {
        windows: platform.windows.clone(),
        messages: platform.windows.clone(),
        selection: platform.selection.clone(),
        memory,
        codec: infra.codec,
        gdi: platform.gdi,
    });

    tracing::debug!(
        drives = config.drives.len(),
        max_handles = config.files.max_handles,
        "kernel wired"
    );
    Ok(KernelRuntime {
        kernel: Kernel::new(files, clipboard, config.files.max_handles),
        windows: platform.windows,
        display: platform.display,
        selection: platform.selection,
        heap: infra.heap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_wiring_creates_missing_drive_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("drive_c");
        let config = KernelConfig::with_system_defaults(root.clone());

        let runtime = wire_kernel(&config).unwrap();

        assert!(root.is_dir());
        assert!(runtime.kernel.handles().is_empty());
        assert_eq!(runtime.windows.window_count(), 1);
    }

    #[test]
    fn test_bad_current_dir_is_reported() {
        let dir = TempDir::new().unwrap();
        let config = KernelConfig::with_system_defaults(dir.path().to_path_buf());

        let result = wire_kernel_on(&config, SelectionDisplay::new(), Some("C:\\*"));

        assert!(matches!(result, Err(WiringError::CurrentDir(_))));
    }
}
