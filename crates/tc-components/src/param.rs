//! Parameter specification model shared by all component kinds.
//!
//! Every scalar component parameter is a [`Param`]: a specification state
//! (unset, pinned, or solved for) plus a [`Role`] saying in which solve
//! mode the specification participates. Characteristic curves get the same
//! treatment through [`CharParam`].

use tc_core::{CharLine, CompId};

use crate::error::{ComponentError, ComponentResult};
use crate::model::EquationContext;

/// Solve mode selecting which parameter roles are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Sizes the plant: design constraints hold, capacity values fall out.
    Design,
    /// Re-solves the sized plant: capacity values hold, design constraints
    /// are released.
    Offdesign,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Design => "design",
            Mode::Offdesign => "offdesign",
        }
    }
}

/// When a parameter specification participates in the equation system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Active in both modes.
    #[default]
    Always,
    /// Active only while solving the design point.
    DesignOnly,
    /// Active only off-design; an unset value falls back to the design
    /// solution.
    OffdesignOnly,
}

impl Role {
    pub fn active(self, mode: Mode) -> bool {
        match self {
            Role::Always => true,
            Role::DesignOnly => mode == Mode::Design,
            Role::OffdesignOnly => mode == Mode::Offdesign,
        }
    }
}

/// Specification state of a scalar parameter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Spec {
    /// Not specified; contributes no equation.
    #[default]
    Unset,
    /// Pinned to a user value (SI units).
    Fixed(f64),
    /// Solved for as a system unknown.
    Var,
}

/// A scalar component parameter: specification plus role.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Param {
    pub spec: Spec,
    pub role: Role,
}

impl Param {
    pub fn unset() -> Self {
        Self::default()
    }

    /// Pin to a value in both modes.
    pub fn fixed(value: f64) -> Self {
        Self {
            spec: Spec::Fixed(value),
            role: Role::Always,
        }
    }

    /// Pin to a value at the design point only.
    pub fn fixed_design(value: f64) -> Self {
        Self {
            spec: Spec::Fixed(value),
            role: Role::DesignOnly,
        }
    }

    /// Solve for the value as a system unknown.
    pub fn var() -> Self {
        Self {
            spec: Spec::Var,
            role: Role::Always,
        }
    }

    /// Hold at the design-derived value during offdesign solves.
    pub fn from_design() -> Self {
        Self {
            spec: Spec::Unset,
            role: Role::OffdesignOnly,
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self.spec, Spec::Unset)
    }

    /// Resolve the parameter's contribution under the context's mode.
    ///
    /// Returns `None` when the parameter is inactive (unset, or its role
    /// excludes the mode). An unset offdesign-only parameter resolves to
    /// the value recorded in the design snapshot; a missing snapshot entry
    /// is an error because the equation cannot be formed without it.
    pub fn resolve(
        &self,
        key: ParamKey,
        ctx: &EquationContext<'_>,
    ) -> ComponentResult<Option<SpecValue>> {
        if !self.role.active(ctx.mode) {
            return Ok(None);
        }
        match self.spec {
            Spec::Fixed(value) => Ok(Some(SpecValue::Const(value))),
            Spec::Var => Ok(Some(SpecValue::Var(ctx.comp, key))),
            Spec::Unset => {
                if self.role == Role::OffdesignOnly {
                    let value = ctx.design_param(key)?;
                    Ok(Some(SpecValue::Const(value)))
                } else {
                    Ok(None)
                }
            }
        }
    }
}

/// A parameter value as seen by an equation: a constant, or a live unknown
/// looked up in the current iterate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpecValue {
    Const(f64),
    Var(CompId, ParamKey),
}

/// A characteristic-curve parameter: an on/off switch plus the curve.
#[derive(Debug, Clone, Default)]
pub struct CharParam {
    pub enabled: bool,
    pub curve: Option<CharLine>,
    pub role: Role,
}

impl CharParam {
    pub fn unset() -> Self {
        Self::default()
    }

    /// Enable in both modes with an explicit curve.
    pub fn with_curve(curve: CharLine) -> Self {
        Self {
            enabled: true,
            curve: Some(curve),
            role: Role::Always,
        }
    }

    /// Enable off-design with an explicit curve (the usual part-load setup).
    pub fn offdesign(curve: CharLine) -> Self {
        Self {
            enabled: true,
            curve: Some(curve),
            role: Role::OffdesignOnly,
        }
    }

    pub fn active(&self, mode: Mode) -> bool {
        self.enabled && self.role.active(mode)
    }

    /// The curve, or a configuration error naming the parameter.
    pub fn require_curve(&self, key: ParamKey) -> ComponentResult<&CharLine> {
        self.curve
            .as_ref()
            .ok_or_else(|| ComponentError::Configuration {
                what: format!("characteristic '{}' enabled without a curve", key.as_str()),
            })
    }
}

/// Identity of a component parameter slot.
///
/// Keys name parameters in design snapshots, configuration errors and
/// `Var`-parameter unknowns. Two-stream components suffix per-stream
/// parameters with the stream number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKey {
    /// Outlet/inlet pressure ratio.
    Pr,
    /// Pressure drop (Pa).
    Dp,
    /// Friction coefficient (1/m^4).
    Zeta,
    /// Heat duty (W).
    Q,
    /// Shaft power (W).
    Power,
    /// Isentropic efficiency.
    EtaS,
    /// Heat-transfer capacity kA (W/K).
    Ka,
    /// Ambient temperature (K).
    TAmb,
    /// Upper terminal temperature difference (K).
    TtdU,
    /// Lower terminal temperature difference (K).
    TtdL,
    Pr1,
    Pr2,
    Dp1,
    Dp2,
    Zeta1,
    Zeta2,
    EtaSChar,
    DpChar,
    FlowChar,
    KaChar,
}

impl ParamKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamKey::Pr => "pr",
            ParamKey::Dp => "dp",
            ParamKey::Zeta => "zeta",
            ParamKey::Q => "q",
            ParamKey::Power => "power",
            ParamKey::EtaS => "eta_s",
            ParamKey::Ka => "ka",
            ParamKey::TAmb => "t_amb",
            ParamKey::TtdU => "ttd_u",
            ParamKey::TtdL => "ttd_l",
            ParamKey::Pr1 => "pr1",
            ParamKey::Pr2 => "pr2",
            ParamKey::Dp1 => "dp1",
            ParamKey::Dp2 => "dp2",
            ParamKey::Zeta1 => "zeta1",
            ParamKey::Zeta2 => "zeta2",
            ParamKey::EtaSChar => "eta_s_char",
            ParamKey::DpChar => "dp_char",
            ParamKey::FlowChar => "flow_char",
            ParamKey::KaChar => "ka_char",
        }
    }

    /// Parse a snapshot parameter name.
    pub fn parse(name: &str) -> Option<Self> {
        const ALL: [ParamKey; 20] = [
            ParamKey::Pr,
            ParamKey::Dp,
            ParamKey::Zeta,
            ParamKey::Q,
            ParamKey::Power,
            ParamKey::EtaS,
            ParamKey::Ka,
            ParamKey::TAmb,
            ParamKey::TtdU,
            ParamKey::TtdL,
            ParamKey::Pr1,
            ParamKey::Pr2,
            ParamKey::Dp1,
            ParamKey::Dp2,
            ParamKey::Zeta1,
            ParamKey::Zeta2,
            ParamKey::EtaSChar,
            ParamKey::DpChar,
            ParamKey::FlowChar,
            ParamKey::KaChar,
        ];
        ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl std::fmt::Display for ParamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
