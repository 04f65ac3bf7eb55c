//! Readiness checks and the not-ready diagnostic report.
use super::Module;
use crate::error::ModuleError;
use crate::graph::SubmoduleGraph;
use crate::property_type::PropertyTypeInfo;
use std::fmt;

/// One unmet requirement of a module.
#[derive(Debug, Clone, PartialEq)]
pub enum Requirement {
    UnsupportedPropertyType { property_type: String },
    MissingInput { name: String, description: String },
    UnboundSubmodule { role: String, property_type: String },
    /// The bound module is itself not ready; `reasons` is its own report.
    UnreadySubmodule { role: String, property_type: String, reasons: NotReadyReport },
    Cycle { path: Vec<String> },
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::UnsupportedPropertyType { property_type } => {
                write!(f, "does not satisfy property type {}", property_type)
            }
            Requirement::MissingInput { name, description } if description.is_empty() => {
                write!(f, "input '{}' has no value", name)
            }
            Requirement::MissingInput { name, description } => {
                write!(f, "input '{}' has no value ({})", name, description)
            }
            Requirement::UnboundSubmodule { role, property_type } => {
                write!(f, "submodule '{}' ({}) is not bound", role, property_type)
            }
            Requirement::UnreadySubmodule { role, property_type, .. } => {
                write!(f, "submodule '{}' ({}) is not ready", role, property_type)
            }
            Requirement::Cycle { path } => write!(f, "cyclic submodule dependency: {}", path.join(" -> ")),
        }
    }
}

/// Every requirement standing between a module and a run, as produced by
/// [`Module::list_not_ready`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotReadyReport {
    entries: Vec<Requirement>,
}

impl NotReadyReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, requirement: Requirement) {
        self.entries.push(requirement);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.entries.iter()
    }

    /// One line per unmet requirement. Reasons of unready submodules follow
    /// their parent entry, prefixed with the role path.
    pub fn descriptions(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.collect_descriptions("", &mut lines);
        lines
    }

    fn collect_descriptions(&self, prefix: &str, lines: &mut Vec<String>) {
        for entry in &self.entries {
            lines.push(format!("{}{}", prefix, entry));
            if let Requirement::UnreadySubmodule { role, reasons, .. } = entry {
                reasons.collect_descriptions(&format!("{}{}: ", prefix, role), lines);
            }
        }
    }
}

impl fmt::Display for NotReadyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.descriptions().into_iter().map(|l| format!("  - {}", l)).collect();
        f.write_str(&lines.join("\n"))
    }
}

/// Coarse lifecycle state of a module with respect to one property type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleStatus {
    Unready,
    Ready,
    Locked,
}

impl Module {
    /// Whether the module can be run as `property_type` right now.
    pub fn ready(&self, property_type: &PropertyTypeInfo) -> bool {
        self.list_not_ready(property_type).is_empty()
    }

    /// Enumerates, without failing, everything that keeps the module from
    /// being run as `property_type`. Empty exactly when [`Module::ready`] is true.
    pub fn list_not_ready(&self, property_type: &PropertyTypeInfo) -> NotReadyReport {
        if let Err(ModuleError::CyclicDependency { path }) = SubmoduleGraph::collect(self).check_acyclic() {
            let mut report = NotReadyReport::new();
            report.push(Requirement::Cycle { path });
            return report;
        }
        self.not_ready_unchecked(property_type)
    }

    pub fn status(&self, property_type: &PropertyTypeInfo) -> ModuleStatus {
        if self.locked() {
            ModuleStatus::Locked
        } else if self.ready(property_type) {
            ModuleStatus::Ready
        } else {
            ModuleStatus::Unready
        }
    }

    /// Recursive readiness walk. Callers must have ruled out cycles.
    pub(crate) fn not_ready_unchecked(&self, property_type: &PropertyTypeInfo) -> NotReadyReport {
        let mut report = NotReadyReport::new();
        if !self.inner.implementation.satisfies(property_type) {
            report.push(Requirement::UnsupportedPropertyType { property_type: property_type.name().to_string() });
        }

        let config = self.snapshot();
        for (name, input) in &config.inputs {
            if !input.is_ready() {
                report.push(Requirement::MissingInput {
                    name: name.clone(),
                    description: input.description().to_string(),
                });
            }
        }
        for (role, slot) in &config.submods {
            let required = slot.property_type();
            match slot.bound() {
                None => report.push(Requirement::UnboundSubmodule {
                    role: role.clone(),
                    property_type: required.name().to_string(),
                }),
                Some(submodule) => {
                    let reasons = submodule.not_ready_unchecked(required);
                    if !reasons.is_empty() {
                        report.push(Requirement::UnreadySubmodule {
                            role: role.clone(),
                            property_type: required.name().to_string(),
                            reasons,
                        });
                    }
                }
            }
        }
        report
    }
}
