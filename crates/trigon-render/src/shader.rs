// SPDX-License-Identifier: CEPL-1.0
use std::borrow::Cow;
use std::path::Path;

use trigon_core::{read_file, ReadFileError};

/// Opaque pre-compiled shader byte code, either baked into the binary or read
/// from disk. The length is the exact blob size.
#[derive(Clone, Debug)]
pub struct ShaderBlob {
    name: String,
    bytes: Cow<'static, [u8]>,
}

impl ShaderBlob {
    pub fn embedded(name: impl Into<String>, bytes: &'static [u8]) -> Self {
        Self {
            name: name.into(),
            bytes: Cow::Borrowed(bytes),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReadFileError> {
        let path = path.as_ref();
        let bytes = read_file(path)?;
        Ok(Self {
            name: path.display().to_string(),
            bytes: Cow::Owned(bytes),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
