use crate::module::{Module, ModuleId};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders `root` and every module reachable through its bindings as an
/// indented tree. A module bound in several places is expanded the first time
/// and referenced by level afterwards.
pub fn format_tree(root: &Module) -> String {
    let mut tracer = Tracer { visited_at_level: HashMap::new(), output: String::new() };
    let _ = writeln!(tracer.output, "MODULE TREE for '{}':", root.name());
    let _ = writeln!(tracer.output, "--------------------------------------------------");
    tracer.trace_module(root, 1, "", "");
    tracer.output
}

struct Tracer {
    visited_at_level: HashMap<ModuleId, usize>,
    output: String,
}

impl Tracer {
    /// `prefix` starts the module's own line, `stem` starts the lines of its children.
    fn trace_module(&mut self, module: &Module, level: usize, prefix: &str, stem: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(&module.id()) {
            let _ = writeln!(self.output, "{}-> (Ref to L{})", prefix, first_seen);
            return;
        }
        self.visited_at_level.insert(module.id(), level);

        let state = if module.locked() { "locked" } else { "configuring" };
        let property_types: Vec<&str> = module.property_types().iter().map(|p| p.name()).collect();
        let _ = writeln!(
            self.output,
            "{}[L{}] {} ({}) : {}",
            prefix,
            level,
            module.name(),
            state,
            property_types.join(", ")
        );

        let inputs = module.inputs();
        let submods = module.submods();
        let total = inputs.len() + submods.len();
        let mut printed = 0;

        for (name, input) in &inputs {
            printed += 1;
            let connector = if printed == total { "`--" } else { "|--" };
            let value = input.value().map_or_else(|| "<unset>".to_string(), |v| v.to_string());
            let _ = writeln!(self.output, "{}{} {} = {}", stem, connector, name, value);
        }

        for (role, slot) in &submods {
            printed += 1;
            let is_last = printed == total;
            let connector = if is_last { "`--" } else { "|--" };
            match slot.bound() {
                Some(submodule) => {
                    let child_prefix = format!("{}{} {}: ", stem, connector, role);
                    let child_stem = format!("{}{}", stem, if is_last { "    " } else { "|   " });
                    self.trace_module(submodule, level + 1, &child_prefix, &child_stem);
                }
                None => {
                    let _ = writeln!(self.output, "{}{} {}: <unbound {}>", stem, connector, role, slot.property_type());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{prism_volume, rectangle, scaled_rectangle, Area, PrismVolume};
    use crate::ModuleBuilder;

    #[test]
    fn test_unbound_role_and_inputs() {
        let prism = prism_volume();
        let tree = format_tree(&prism);
        assert_eq!(
            tree,
            "MODULE TREE for 'PrismVolumeBySubmod':\n\
             --------------------------------------------------\n\
             [L1] PrismVolumeBySubmod (configuring) : PrismVolume\n\
             `-- area: <unbound Area>\n"
        );
    }

    #[test]
    fn test_nested_module_with_input() {
        let prism = prism_volume();
        prism.change_submod("area", &scaled_rectangle()).unwrap();
        prism.lock().unwrap();
        let lines: Vec<String> = format_tree(&prism).lines().skip(2).map(str::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "[L1] PrismVolumeBySubmod (locked) : PrismVolume",
                "`-- area: [L2] ScaledRectangle (locked) : Area",
                "    `-- scale = 1",
            ]
        );
    }

    #[test]
    fn test_shared_submodule_is_referenced() {
        let rect = rectangle();
        let twice = ModuleBuilder::new("TwoBases")
            .submodule::<Area>("first", "")
            .submodule::<Area>("second", "")
            .bind("first", &rect)
            .bind("second", &rect)
            .satisfies::<PrismVolume, _>(|(b, h, w), ctx| {
                let (a1,) = ctx.run_as::<Area>("first", (b, h))?;
                let (a2,) = ctx.run_as::<Area>("second", (b, h))?;
                Ok(((a1 + a2) * w,))
            })
            .build()
            .unwrap();
        let lines: Vec<String> = format_tree(&twice).lines().skip(2).map(str::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "[L1] TwoBases (configuring) : PrismVolume",
                "|-- first: [L2] Rectangle (configuring) : Area",
                "`-- second: -> (Ref to L2)",
            ]
        );
    }
}
