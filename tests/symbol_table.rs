use pogc::analyzer::{ScopeError, SymbolTable, Ty};
use pogc::lexer::Position;

fn pos(line: usize) -> Position {
    Position::new(line, 0)
}

#[test]
fn global_scope_is_never_popped() {
    let mut table = SymbolTable::new();
    assert_eq!(table.depth(), 1);
    assert_eq!(table.exit_scope(), Err(ScopeError::ScopeUnderflow));

    table.enter_scope();
    assert_eq!(table.depth(), 2);
    assert_eq!(table.exit_scope(), Ok(()));
    assert_eq!(table.exit_scope(), Err(ScopeError::ScopeUnderflow));
}

#[test]
fn redeclaring_in_the_same_scope_fails() {
    let mut table = SymbolTable::new();
    table.declare("x", Ty::Int, pos(1)).unwrap();
    assert_eq!(
        table.declare("x", Ty::String, pos(2)),
        Err(ScopeError::DuplicateDeclaration {
            name: "x".to_string(),
            previous: pos(1),
        })
    );

    table.enter_scope();
    table.declare("y", Ty::Int, pos(3)).unwrap();
    assert!(table.declare("y", Ty::Int, pos(4)).is_err());
}

#[test]
fn nested_scope_shadows() {
    let mut table = SymbolTable::new();
    table.declare("x", Ty::Int, pos(1)).unwrap();

    table.enter_scope();
    table.declare("x", Ty::String, pos(2)).unwrap();
    assert_eq!(table.lookup("x").unwrap().ty, Ty::String);

    table.exit_scope().unwrap();
    assert_eq!(table.lookup("x").unwrap().ty, Ty::Int);
}

#[test]
fn lookup_searches_outward() {
    let mut table = SymbolTable::new();
    table.declare("outer", Ty::Int, pos(1)).unwrap();
    table.enter_scope();
    table.enter_scope();
    assert_eq!(table.lookup("outer").unwrap().pos, pos(1));
    assert_eq!(
        table.lookup("missing"),
        Err(ScopeError::Undeclared {
            name: "missing".to_string()
        })
    );
}

#[test]
fn names_leave_with_their_scope() {
    let mut table = SymbolTable::new();
    table.enter_scope();
    table.declare("tmp", Ty::Int, pos(1)).unwrap();
    table.exit_scope().unwrap();
    assert!(table.lookup("tmp").is_err());
    // still known to later stages
    assert_eq!(table.symbols().len(), 1);
}

#[test]
fn every_declaration_gets_its_own_slot() {
    let mut table = SymbolTable::new();
    table.declare("x", Ty::Int, pos(1)).unwrap();
    table.enter_scope();
    let inner = table.declare("x", Ty::String, pos(2)).unwrap();
    table.exit_scope().unwrap();
    table.enter_scope();
    table.declare("x", Ty::Int, pos(3)).unwrap();

    let slots: Vec<_> = table.symbols().iter().map(|s| s.slot.as_str()).collect();
    assert_eq!(slots, vec!["x", "x.1", "x.2"]);
    assert_eq!(table.get(inner).slot, "x.1");
    assert_eq!(table.lookup("x").unwrap().slot, "x.2");
    assert_eq!(table.lookup("x").unwrap().pos, pos(3));
}

#[test]
fn bindings_resolve_positions() {
    let mut table = SymbolTable::new();
    let id = table.declare("n", Ty::Int, pos(1)).unwrap();
    let use_site = Position::new(4, 7);
    assert!(table.resolve(use_site).is_none());

    table.bind(use_site, id);
    assert_eq!(table.resolve(use_site).unwrap().name, "n");
    assert_eq!(table.resolve(pos(1)).unwrap().id, id);
}
