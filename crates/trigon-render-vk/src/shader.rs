// SPDX-License-Identifier: CEPL-1.0
use std::io::Cursor;

use ash::util::read_spv;
use ash::vk;
use trigon_render::ShaderBlob;

use crate::error::{Result, VkError};

static TRIANGLE_VERT: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/triangle.vert.spv"));
static TRIANGLE_FRAG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/triangle.frag.spv"));

/// Built-in vertex/fragment pair drawing the hardcoded triangle.
pub fn triangle_shaders() -> (ShaderBlob, ShaderBlob) {
    (
        ShaderBlob::embedded("triangle.vert", TRIANGLE_VERT),
        ShaderBlob::embedded("triangle.frag", TRIANGLE_FRAG),
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn flags(self) -> vk::ShaderStageFlags {
        match self {
            Self::Vertex => vk::ShaderStageFlags::VERTEX,
            Self::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        }
    }
}

/// SPIR-V decoded into aligned words. Kept for the lifetime of the engine so
/// pipeline rebuilds never touch the blobs again.
#[derive(Clone, Debug)]
pub struct ShaderCode {
    pub stage: ShaderStage,
    words: Vec<u32>,
}

impl ShaderCode {
    /// Rejects blobs whose length is not a whole number of words or that lack
    /// the SPIR-V magic.
    pub fn from_blob(stage: ShaderStage, blob: &ShaderBlob) -> Result<Self> {
        let words = read_spv(&mut Cursor::new(blob.bytes())).map_err(|e| VkError::ShaderCode {
            stage: stage.name(),
            reason: format!("{}: {e}", blob.name()),
        })?;
        Ok(Self { stage, words })
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn byte_len(&self) -> usize {
        self.words.len() * 4
    }
}
