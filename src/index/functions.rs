//! Function facts.

use crate::analysis::FunctionFact;
use crate::ast::TranslationUnit;
use crate::db::FunctionDatabase;

/// Record every function and method definition of `tu`.
pub fn index_unit(tu: &TranslationUnit, db: &mut FunctionDatabase) {
    if !tu.file().in_project() {
        return;
    }
    for function in tu.functions() {
        let (Some(location), Some(body)) = (tu.location(function.node), tu.location(function.body))
        else {
            continue;
        };
        db.add(FunctionFact {
            name: function.name.clone(),
            location,
            body,
            return_type: function.return_type.clone(),
            pure: function.is_pure,
            global: function.is_global,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::lower;

    #[test]
    fn test_function_facts() {
        let src = "static int helper(int x) {\n  return x;\n}\nint api(void) {\n  return helper(1);\n}\nint proto(void);\n";
        let tu = lower("/p/fns.c", src);
        let mut db = FunctionDatabase::new();
        index_unit(&tu, &mut db);

        let facts = db.entries();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].name, "helper");
        assert!(!facts[0].global);
        assert_eq!(facts[0].location.to_string(), "/p/fns.c@1:1::3:2");
        assert_eq!(facts[0].body.to_string(), "/p/fns.c@1:26::3:2");
        assert_eq!(facts[1].name, "api");
        assert_eq!(facts[1].return_type, "int");
        assert!(facts[1].global);
        assert!(!facts[1].pure);
    }

    #[test]
    fn test_external_unit_has_no_functions() {
        let mut tu = lower("/usr/include/x.h", "int f(void) { return 0; }\n");
        tu.file_mut().set_in_project(false);
        let mut db = FunctionDatabase::new();
        index_unit(&tu, &mut db);
        assert!(db.entries().is_empty());
    }
}
