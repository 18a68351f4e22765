//! Unit tests for bytecode_system components

use bytecode_system::{CodeBuilder, Constant, LocalSlot, Opcode};

// ============================================================================
// CodeBuilder Tests
// ============================================================================

#[test]
fn test_builder_emits_in_order() {
    let mut builder = CodeBuilder::new("f", &["x"]);
    builder.load_local("x");
    builder.load_constant(1);
    builder.emit(Opcode::Add).emit(Opcode::Return);

    let code = builder.build();
    assert_eq!(
        code.instructions(),
        &[
            Opcode::LoadLocal(LocalSlot(0)),
            Opcode::LoadConstant(0),
            Opcode::Add,
            Opcode::Return,
        ]
    );
    assert_eq!(code.constants(), &[Constant::Int(1)]);
}

#[test]
fn test_store_local_declares_slot() {
    let mut builder = CodeBuilder::new("f", &["x"]);
    builder.load_constant(2).store_local("tmp");

    let code = builder.build();
    assert_eq!(code.arg_count(), 1);
    assert_eq!(code.local_count(), 2);
    assert_eq!(code.local_index("tmp"), Some(1));
}

#[test]
fn test_slot_lookup_before_build() {
    let mut builder = CodeBuilder::new("f", &["a", "b"]);
    builder.add_local("c");
    assert_eq!(builder.slot("b"), Some(LocalSlot(1)));
    assert_eq!(builder.slot("c"), Some(LocalSlot(2)));
    assert_eq!(builder.slot("d"), None);
}

#[test]
fn test_derived_code_may_reorder_and_extend_locals() {
    let mut builder = CodeBuilder::new("f", &["x", "y"]);
    builder.load_local("x").emit(Opcode::Return);
    let original = builder.build();

    let mut derived = original.derive();
    derived.insert_local_front("__tmp");
    derived.add_local("z");
    let replacement = derived.build();

    for name in original.varnames() {
        assert!(replacement.local_index(name).is_some());
    }
    assert_eq!(replacement.local_count(), original.local_count() + 2);
}

// ============================================================================
// Constant Tests
// ============================================================================

#[test]
fn test_constant_variants() {
    assert_eq!(Constant::from(1.5), Constant::Float(1.5));
    assert_eq!(Constant::from(false), Constant::Bool(false));
}
