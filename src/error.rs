use thiserror::Error;

use crate::resource::ResourceError;

/// Configuration problems detected before a pass starts.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No render target set")]
    MissingRenderTarget,

    #[error("No {0} shader set")]
    MissingShader(&'static str),

    #[error("No {0} buffer set")]
    MissingBuffer(&'static str),

    #[error(
        "Viewport {viewport_width}x{viewport_height} does not fit into {target_width}x{target_height} render target"
    )]
    ViewportExceedsTarget {
        viewport_width: usize,
        viewport_height: usize,
        target_width: usize,
        target_height: usize,
    },

    #[error("Failed to start worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}
