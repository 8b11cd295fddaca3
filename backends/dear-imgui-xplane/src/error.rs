//! Error types for the X-Plane backend

use thiserror::Error;

/// Errors that can occur while creating a window, its GUI context or its renderer
#[derive(Error, Debug)]
pub enum InitError {
    /// Dear ImGui context could not be created or activated
    #[error("Failed to set up Dear ImGui context: {0}")]
    Context(String),

    /// The simulator refused to create a native window
    #[error("Failed to create native window")]
    CreateWindow,

    /// The simulator refused to create a flight loop callback
    #[error("Failed to create flight loop")]
    CreateFlightLoop,

    /// A required dataref is not published by the simulator
    #[error("Missing dataref: {0}")]
    MissingDataRef(String),

    /// Failed to create OpenGL shader
    #[error("Failed to create shader: {0}")]
    CreateShader(String),

    /// Failed to compile shader
    #[error("Failed to compile shader: {0}")]
    CompileShader(String),

    /// Failed to link shader program
    #[error("Failed to link program: {0}")]
    LinkProgram(String),

    /// Failed to create OpenGL buffer object
    #[error("Failed to create buffer object: {0}")]
    CreateBufferObject(String),

    /// Generic initialization error
    #[error("Initialization error: {0}")]
    Generic(String),
}

/// Errors that can occur while rendering a frame
#[derive(Error, Debug)]
pub enum RenderError {
    /// OpenGL error
    #[error("OpenGL error: {0}")]
    OpenGl(String),

    /// A draw command referenced a texture this renderer does not know
    #[error("Invalid texture: {0}")]
    InvalidTexture(u64),

    /// Renderer was destroyed
    #[error("Renderer was destroyed")]
    RendererDestroyed,
}

/// Result type for initialization operations
pub type InitResult<T> = Result<T, InitError>;

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
