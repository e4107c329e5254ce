//! Rasterization, frame rendering and the buffer pipeline.

pub mod framebuffer;
pub mod pipeline;
pub mod rasterizer;
pub mod renderer;

pub use framebuffer::{BufferPair, FrameBuffer};
pub use pipeline::{FramePipeline, RenderJob};
pub use rasterizer::{
    EdgeFunctionRasterizer, Rasterizer, RasterizerDispatcher, RasterizerType, ScanlineRasterizer,
    ScreenTriangle, ScreenVertex,
};
pub use renderer::{FrameRenderer, FrameStats};
