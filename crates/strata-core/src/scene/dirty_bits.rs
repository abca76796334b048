// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-primitive dirty-bit mask.

use crate::strata_bitflags;
use std::fmt;

strata_bitflags! {
    /// A mask describing which categories of a primitive's data are stale.
    ///
    /// The all-zero value is [`DirtyBits::CLEAN`]. [`DirtyBits::VARYING`] is a
    /// meta-flag recording that the primitive's dirtiness changed recently; it
    /// is preserved by clean operations and only cleared by an explicit
    /// varying-state reset.
    pub struct DirtyBits: u32 {
        /// Nothing is dirty.
        const CLEAN = 0;
        /// The primitive's representation must be initialized.
        const INIT_REPR = 1 << 0;
        /// The primitive's dirtiness changed recently.
        const VARYING = 1 << 1;
        /// The primitive id changed.
        const DIRTY_PRIM_ID = 1 << 2;
        /// The bounding extent changed.
        const DIRTY_EXTENT = 1 << 3;
        /// The display style changed.
        const DIRTY_DISPLAY_STYLE = 1 << 4;
        /// The point positions changed.
        const DIRTY_POINTS = 1 << 5;
        /// A generic primvar changed.
        const DIRTY_PRIMVAR = 1 << 6;
        /// The bound material changed.
        const DIRTY_MATERIAL_ID = 1 << 7;
        /// The topology changed.
        const DIRTY_TOPOLOGY = 1 << 8;
        /// The transform changed.
        const DIRTY_TRANSFORM = 1 << 9;
        /// The visibility changed.
        const DIRTY_VISIBILITY = 1 << 10;
        /// The normals changed.
        const DIRTY_NORMALS = 1 << 11;
        /// The double-sided state changed.
        const DIRTY_DOUBLE_SIDED = 1 << 12;
        /// The cull style changed.
        const DIRTY_CULL_STYLE = 1 << 13;
        /// The subdivision tags changed.
        const DIRTY_SUBDIV_TAGS = 1 << 14;
        /// The curve widths changed.
        const DIRTY_WIDTHS = 1 << 15;
        /// Upstream instancer data changed.
        const DIRTY_INSTANCER = 1 << 16;
        /// The instance indices changed.
        const DIRTY_INSTANCE_INDEX = 1 << 17;
        /// The requested representation changed.
        const DIRTY_REPR = 1 << 18;
        /// The render tag changed.
        const DIRTY_RENDER_TAG = 1 << 19;
        /// A computed primvar descriptor changed.
        const DIRTY_COMPUTATION_PRIMVAR_DESC = 1 << 20;
        /// The light-linking categories changed.
        const DIRTY_CATEGORIES = 1 << 21;
        /// A volume field binding changed.
        const DIRTY_VOLUME_FIELD = 1 << 22;
        /// Every scene-level bit.
        const ALL_SCENE_DIRTY_BITS = (1 << 23) - 1;
        /// A new representation was requested for an existing primitive.
        const NEW_REPR = 1 << 23;
        /// First bit of the range reserved for renderer extensions.
        const CUSTOM_BITS_BEGIN = 1 << 24;
        /// Last bit of the range reserved for renderer extensions.
        const CUSTOM_BITS_END = 1 << 30;
        /// Every bit except [`DirtyBits::VARYING`].
        const ALL_DIRTY = !(1 << 1);
    }
}

const NAMED_BITS: &[(DirtyBits, &str)] = &[
    (DirtyBits::DIRTY_PRIM_ID, "PrimID"),
    (DirtyBits::DIRTY_EXTENT, "Extent"),
    (DirtyBits::DIRTY_DISPLAY_STYLE, "DisplayStyle"),
    (DirtyBits::DIRTY_POINTS, "Points"),
    (DirtyBits::DIRTY_PRIMVAR, "Primvar"),
    (DirtyBits::DIRTY_MATERIAL_ID, "MaterialId"),
    (DirtyBits::DIRTY_TOPOLOGY, "Topology"),
    (DirtyBits::DIRTY_TRANSFORM, "Transform"),
    (DirtyBits::DIRTY_VISIBILITY, "Visibility"),
    (DirtyBits::DIRTY_NORMALS, "Normals"),
    (DirtyBits::DIRTY_DOUBLE_SIDED, "DoubleSided"),
    (DirtyBits::DIRTY_CULL_STYLE, "CullStyle"),
    (DirtyBits::DIRTY_SUBDIV_TAGS, "SubdivTags"),
    (DirtyBits::DIRTY_WIDTHS, "Widths"),
    (DirtyBits::DIRTY_INSTANCER, "Instancer"),
    (DirtyBits::DIRTY_INSTANCE_INDEX, "InstanceIndex"),
    (DirtyBits::DIRTY_REPR, "Repr"),
    (DirtyBits::DIRTY_RENDER_TAG, "RenderTag"),
    (DirtyBits::DIRTY_COMPUTATION_PRIMVAR_DESC, "ComputationPrimvarDesc"),
    (DirtyBits::DIRTY_CATEGORIES, "Categories"),
    (DirtyBits::DIRTY_VOLUME_FIELD, "VolumeField"),
    (DirtyBits::NEW_REPR, "NewRepr"),
];

impl DirtyBits {
    /// Returns `true` if any bit other than [`DirtyBits::VARYING`] is set.
    pub const fn is_dirty(&self) -> bool {
        self.intersects(DirtyBits::ALL_DIRTY)
    }

    /// Returns `true` if only [`DirtyBits::VARYING`] (or nothing) is set.
    pub const fn is_clean(&self) -> bool {
        !self.is_dirty()
    }

    /// Returns `true` if the primitive is flagged as varying.
    pub const fn is_varying(&self) -> bool {
        self.intersects(DirtyBits::VARYING)
    }

    /// Returns the bit that tracks the primvar called `name`.
    ///
    /// `points`, `normals` and `widths` have dedicated bits; every other
    /// primvar shares [`DirtyBits::DIRTY_PRIMVAR`].
    pub fn for_primvar(name: &str) -> DirtyBits {
        match name {
            "points" => DirtyBits::DIRTY_POINTS,
            "normals" => DirtyBits::DIRTY_NORMALS,
            "widths" => DirtyBits::DIRTY_WIDTHS,
            _ => DirtyBits::DIRTY_PRIMVAR,
        }
    }

    /// Sets the bit that tracks the primvar called `name`.
    pub fn mark_primvar(&mut self, name: &str) {
        self.insert(DirtyBits::for_primvar(name));
    }
}

impl fmt::Display for DirtyBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bits == 0 {
            return write!(f, "Clean");
        }

        let mut parts: Vec<&str> = Vec::new();
        if self.contains(DirtyBits::VARYING) {
            parts.push("<Varying>");
        }
        if self.contains(DirtyBits::INIT_REPR) {
            parts.push("<InitRepr>");
        }
        for (bit, name) in NAMED_BITS {
            if self.contains(*bit) {
                parts.push(*name);
            }
        }
        write!(f, "{}", parts.join(" "))?;

        let custom = self.bits & !(DirtyBits::ALL_SCENE_DIRTY_BITS.bits | DirtyBits::NEW_REPR.bits);
        if custom != 0 {
            if !parts.is_empty() {
                write!(f, " ")?;
            }
            write!(f, "CustomBits:")?;
            let mut bit = DirtyBits::CUSTOM_BITS_BEGIN.bits;
            while bit <= DirtyBits::CUSTOM_BITS_END.bits {
                write!(f, "{}", if custom & bit != 0 { '1' } else { '0' })?;
                bit <<= 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_is_zero() {
        assert_eq!(DirtyBits::CLEAN.bits(), 0);
        assert!(DirtyBits::CLEAN.is_clean());
        assert!(DirtyBits::VARYING.is_clean());
        assert!(DirtyBits::DIRTY_POINTS.is_dirty());
    }

    #[test]
    fn test_all_dirty_excludes_varying() {
        assert!(!DirtyBits::ALL_DIRTY.contains(DirtyBits::VARYING));
        assert!(DirtyBits::ALL_DIRTY.contains(DirtyBits::DIRTY_TOPOLOGY));
        assert!(DirtyBits::ALL_DIRTY.contains(DirtyBits::CUSTOM_BITS_BEGIN));
    }

    #[test]
    fn test_primvar_mapping() {
        assert_eq!(DirtyBits::for_primvar("points"), DirtyBits::DIRTY_POINTS);
        assert_eq!(DirtyBits::for_primvar("normals"), DirtyBits::DIRTY_NORMALS);
        assert_eq!(DirtyBits::for_primvar("widths"), DirtyBits::DIRTY_WIDTHS);
        assert_eq!(DirtyBits::for_primvar("displayColor"), DirtyBits::DIRTY_PRIMVAR);

        let mut bits = DirtyBits::CLEAN;
        bits.mark_primvar("normals");
        assert_eq!(bits, DirtyBits::DIRTY_NORMALS);
    }

    #[test]
    fn test_display() {
        assert_eq!(DirtyBits::CLEAN.to_string(), "Clean");
        assert_eq!(
            (DirtyBits::VARYING | DirtyBits::DIRTY_POINTS | DirtyBits::DIRTY_TRANSFORM).to_string(),
            "<Varying> Points Transform"
        );
        let custom = DirtyBits::DIRTY_TOPOLOGY | DirtyBits::CUSTOM_BITS_BEGIN;
        assert_eq!(custom.to_string(), "Topology CustomBits:1000000");
    }
}
