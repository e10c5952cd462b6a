//! Configuration selection and image lists
//!
//! `/configurations` carries one child node per bootable configuration and a
//! `default` property naming the one to use. Each configuration lists its
//! images per role as a NUL-separated sequence of image node names, walked
//! by index.

use crate::error::{FitError, Result};
use crate::tree::{Fit, Node};
use crate::types::ImageRole;

/// A selected boot configuration
#[derive(Debug, Clone, Copy)]
pub struct Configuration<'a> {
    /// The configuration node
    pub node: Node,
    /// Configuration node name
    pub name: &'a str,
    /// Human-readable description, if present
    pub description: Option<&'a str>,
}

impl<'a> Fit<'a> {
    /// Select the default boot configuration.
    ///
    /// The `default` property of `/configurations` must name an existing
    /// child node; a missing property or a dangling reference is
    /// `NoDefaultConfig`. There is no first-configuration fallback.
    pub fn select_configuration(&self) -> Result<Configuration<'a>> {
        let configs = self
            .subnode(self.root(), "configurations")?
            .ok_or(FitError::NoConfigurations)?;

        let default = self
            .property_str(configs, "default")?
            .ok_or(FitError::NoDefaultConfig)?;

        let node = self
            .subnode(configs, default)?
            .ok_or(FitError::NoDefaultConfig)?;

        Ok(Configuration {
            node,
            name: default,
            description: self.property_str(node, "description")?,
        })
    }

    /// Name of the `index`-th image of a role within a configuration.
    ///
    /// Returns `Ok(None)` once `index` walks past the end of the list; the
    /// property being absent entirely is `MissingProperty`.
    pub fn image_name(
        &self,
        config: &Configuration<'a>,
        role: ImageRole,
        index: usize,
    ) -> Result<Option<&'a str>> {
        let value = self
            .property(config.node, role.prop_name())?
            .ok_or(FitError::MissingProperty)?;

        let mut remaining = value;
        for _ in 0..index {
            match remaining.iter().position(|&b| b == 0) {
                Some(nul) if nul + 1 < remaining.len() => {
                    remaining = &remaining[nul + 1..];
                }
                _ => return Ok(None),
            }
        }

        let end = remaining
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(remaining.len());
        if end == 0 {
            return Ok(None);
        }
        core::str::from_utf8(&remaining[..end])
            .map(Some)
            .map_err(|_| FitError::InvalidString)
    }

    /// Resolve the `index`-th image of a role to its `/images` node.
    ///
    /// `Ok(None)` means the list is exhausted; a name that resolves to no
    /// image node is `ImageNotFound`.
    pub fn image_node(
        &self,
        config: &Configuration<'a>,
        role: ImageRole,
        index: usize,
    ) -> Result<Option<Node>> {
        let name = match self.image_name(config, role, index)? {
            Some(name) => name,
            None => return Ok(None),
        };

        let images = self
            .subnode(self.root(), "images")?
            .ok_or(FitError::NoImagesNode)?;

        self.subnode(images, name)?
            .map(Some)
            .ok_or(FitError::ImageNotFound)
    }
}
