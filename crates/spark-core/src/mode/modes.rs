//! Light/dark pairs of tokens and components.

use std::ops::Index;

use crate::component::Component;
use crate::error::Result;
use crate::mode::ColorMode;
use crate::registry::{ForkOptions, StyleRegistry};
use crate::token::Token;
use crate::tree::{StyleNode, ValueTree};

/// Something that can be forked inside a registry.
///
/// [`StyleRegistry::build_modes`] works over any `Forkable`, so tokens and
/// components get modes the same way.
pub trait Forkable: Sized {
    /// What a fork is made from.
    type Patch;

    fn fork_in(
        &self,
        registry: &mut StyleRegistry,
        patch: &Self::Patch,
        options: ForkOptions,
    ) -> Result<Self>;
}

impl Forkable for Token {
    type Patch = ValueTree;

    fn fork_in(
        &self,
        registry: &mut StyleRegistry,
        patch: &ValueTree,
        options: ForkOptions,
    ) -> Result<Self> {
        registry.fork_token_with(self, patch, options)
    }
}

impl Forkable for Component {
    type Patch = StyleNode;

    fn fork_in(
        &self,
        registry: &mut StyleRegistry,
        patch: &StyleNode,
        options: ForkOptions,
    ) -> Result<Self> {
        registry.fork_with(self, patch, options)
    }
}

/// One handle per color mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeMap<T> {
    pub light: T,
    pub dark: T,
}

impl<T> ModeMap<T> {
    pub fn get(&self, mode: ColorMode) -> &T {
        match mode {
            ColorMode::Light => &self.light,
            ColorMode::Dark => &self.dark,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColorMode, &T)> {
        ColorMode::ALL.into_iter().map(move |mode| (mode, self.get(mode)))
    }
}

impl<T> Index<ColorMode> for ModeMap<T> {
    type Output = T;

    fn index(&self, mode: ColorMode) -> &T {
        self.get(mode)
    }
}
