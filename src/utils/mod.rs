//! Shared helpers for provider adapters and the orchestrator.

pub mod headers;
pub mod json_shape;
pub mod tool_call_assembler;

pub use tool_call_assembler::ToolCallAssembler;
