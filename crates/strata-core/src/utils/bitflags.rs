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

//! `strata_bitflags!`: compact flag-set newtypes over an unsigned integer.
//!
//! Every bit survives construction, so masks can carry bits that have no
//! named constant (custom primvar bits, for instance).

#[macro_export]
#[doc(hidden)]
macro_rules! strata_bitflags {
    (@binop $name:ident, $op:ident, $method:ident, $assign_op:ident, $assign_method:ident, $tok:tt) => {
        impl core::ops::$op for $name {
            type Output = Self;
            fn $method(self, rhs: Self) -> Self {
                Self { bits: self.bits $tok rhs.bits }
            }
        }

        impl core::ops::$assign_op for $name {
            fn $assign_method(&mut self, rhs: Self) {
                *self = core::ops::$op::$method(*self, rhs);
            }
        }
    };

    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                $(#[$flag_attr:meta])*
                const $flag_name:ident = $flag_value:expr;
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
        $vis struct $name {
            pub(crate) bits: $ty,
        }

        impl $name {
            /// No bit set.
            pub const EMPTY: Self = Self { bits: 0 };

            $(
                $(#[$flag_attr])*
                pub const $flag_name: Self = Self { bits: $flag_value };
            )*

            /// Wraps raw bits as-is.
            pub const fn from_bits_truncate(bits: $ty) -> Self {
                Self { bits }
            }

            /// The raw mask.
            pub const fn bits(&self) -> $ty {
                self.bits
            }

            /// `true` when no bit is set.
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// `true` when every bit of `other` is also set here.
            pub const fn contains(&self, other: Self) -> bool {
                self.bits & other.bits == other.bits
            }

            /// `true` when at least one bit of `other` is set here.
            pub const fn intersects(&self, other: Self) -> bool {
                self.bits & other.bits != 0
            }

            /// Bits set in either mask.
            pub const fn union(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }

            /// Bits set in both masks.
            pub const fn intersection(self, other: Self) -> Self {
                Self { bits: self.bits & other.bits }
            }

            /// Bits set here but not in `other`.
            pub const fn difference(self, other: Self) -> Self {
                Self { bits: self.bits & !other.bits }
            }

            /// Sets the bits of `other`.
            pub fn insert(&mut self, other: Self) {
                *self = self.union(other);
            }

            /// Clears the bits of `other`.
            pub fn remove(&mut self, other: Self) {
                *self = self.difference(other);
            }

            /// Builder-style [`Self::insert`].
            #[must_use]
            pub const fn with(self, other: Self) -> Self {
                self.union(other)
            }

            /// Builder-style [`Self::remove`].
            #[must_use]
            pub const fn without(self, other: Self) -> Self {
                self.difference(other)
            }
        }

        $crate::strata_bitflags!(@binop $name, BitOr, bitor, BitOrAssign, bitor_assign, |);
        $crate::strata_bitflags!(@binop $name, BitAnd, bitand, BitAndAssign, bitand_assign, &);
        $crate::strata_bitflags!(@binop $name, BitXor, bitxor, BitXorAssign, bitxor_assign, ^);

        impl core::ops::Not for $name {
            type Output = Self;
            fn not(self) -> Self {
                Self { bits: !self.bits }
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, concat!(stringify!($name), "({:#x})"), self.bits)
            }
        }
    };
}
