mod existing_classes_in_closure_typehints;

pub use existing_classes_in_closure_typehints::ExistingClassesInClosureTypehintsRule;
