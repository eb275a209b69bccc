//! Rye AST definitions
//!
//! This crate defines the abstract syntax tree (AST) for the Rye language.
//! It serves as the contract between the parser and the compiler core: the
//! parser produces it, the semantic analyzer annotates it in place, and the
//! codegen collaborator consumes the annotated tree.

use std::ops::Range;

/// Represents a source code span as a byte range.
pub type Span = Range<usize>;

/// Identity of an AST node within one compilation.
///
/// Ids are assigned after parsing (see `rye_parser::parsed`) and key the
/// analyzer's use-count map. `UNSET` marks a freshly constructed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const UNSET: NodeId = NodeId(0);
}

/// Identity of a module unit inside the module registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(pub u32);

impl ModuleId {
    /// The module being compiled directly (registry slot 0).
    pub const ROOT: ModuleId = ModuleId(0);
}

/// Opaque handle to a symbol record in the compiler's symbol arena.
///
/// Written into variable nodes during resolution so downstream phases can
/// get back to the declaration without re-running the scope walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// A resolved source position, computed from a byte span and the owning
/// module's source text. Attached to every diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// 1-indexed line.
    pub line: u32,
    /// 1-indexed column.
    pub column: u32,
    /// Path of the source file.
    pub file: String,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32, file: impl Into<String>) -> Self {
        Self {
            line,
            column,
            file: file.into(),
        }
    }

    /// Location for synthetic nodes with no source position.
    pub fn synthetic() -> Self {
        Self {
            line: 0,
            column: 0,
            file: String::new(),
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// An identifier with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub sym: String,
    pub span: Span,
}

impl Ident {
    pub fn new(sym: impl Into<String>, span: Span) -> Self {
        Self {
            sym: sym.into(),
            span,
        }
    }
}

/// The top-level module AST node.
#[derive(Debug, Clone)]
pub struct Module {
    /// Declared module name (`module foo;`), or None when the name is
    /// derived from the file stem.
    pub name: Option<Ident>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Statements in the AST.
#[derive(Debug, Clone)]
pub enum Stmt {
    Imports(ImportsStmt),
    Import(ImportStmt),
    /// The no-op statement (`;`). Skipped when probing for a trailing
    /// return and exempt from unreachable-code warnings.
    Empty(EmptyStmt),
    Block(BlockStmt),
    Expr(ExprStmt),
    VarDecl(VarDecl),
    Alias(AliasDecl),
    UseModule(UseModuleStmt),
    FuncDecl(FuncDecl),
    ClassDecl(ClassDecl),
    EnumDecl(EnumDecl),
    Print(PrintStmt),
    Return(ReturnStmt),
    If(IfStmt),
    For(Box<ForStmt>),
    While(WhileStmt),
    Try(TryStmt),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Imports(s) => s.span.clone(),
            Stmt::Import(s) => s.span.clone(),
            Stmt::Empty(s) => s.span.clone(),
            Stmt::Block(s) => s.span.clone(),
            Stmt::Expr(s) => s.span.clone(),
            Stmt::VarDecl(s) => s.span.clone(),
            Stmt::Alias(s) => s.span.clone(),
            Stmt::UseModule(s) => s.span.clone(),
            Stmt::FuncDecl(s) => s.span.clone(),
            Stmt::ClassDecl(s) => s.span.clone(),
            Stmt::EnumDecl(s) => s.span.clone(),
            Stmt::Print(s) => s.span.clone(),
            Stmt::Return(s) => s.span.clone(),
            Stmt::If(s) => s.span.clone(),
            Stmt::For(s) => s.span.clone(),
            Stmt::While(s) => s.span.clone(),
            Stmt::Try(s) => s.span.clone(),
        }
    }
}

/// A group of import statements (`import "a", "b";`).
#[derive(Debug, Clone)]
pub struct ImportsStmt {
    pub id: NodeId,
    pub imports: Vec<ImportStmt>,
    pub span: Span,
}

/// A single import (`import "path";`).
#[derive(Debug, Clone)]
pub struct ImportStmt {
    pub id: NodeId,
    /// The import token as written in the source.
    pub path: String,
    pub module: ModuleId,
    pub span: Span,
}

/// The no-op statement.
#[derive(Debug, Clone)]
pub struct EmptyStmt {
    pub id: NodeId,
    pub span: Span,
}

/// Block statement.
#[derive(Debug, Clone)]
pub struct BlockStmt {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// Expression statement.
#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub id: NodeId,
    pub expr: Expr,
    pub span: Span,
}

/// Variable declaration (`let x = e;` / `const x = e;`).
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub id: NodeId,
    pub ident: Ident,
    pub is_const: bool,
    pub init: Expr,
    pub module: ModuleId,
    pub span: Span,
}

/// Alias declaration (`alias x = target;`).
#[derive(Debug, Clone)]
pub struct AliasDecl {
    pub id: NodeId,
    pub ident: Ident,
    pub target: Expr,
    pub module: ModuleId,
    pub span: Span,
}

/// Module-wide aliasing directive (`use foo;`). Currently rejected by the
/// analyzer with an unsupported-feature diagnostic.
#[derive(Debug, Clone)]
pub struct UseModuleStmt {
    pub id: NodeId,
    pub ident: Ident,
    pub module: ModuleId,
    pub span: Span,
}

/// Function definition.
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub id: NodeId,
    pub ident: Ident,
    pub params: Vec<Ident>,
    pub body: BlockStmt,
    /// Leading attributes (`inline func ...`).
    pub attributes: Vec<String>,
    pub module: ModuleId,
    pub span: Span,
}

impl FuncDecl {
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a == name)
    }
}

/// Class declaration. Parsed for forward compatibility; the analyzer does
/// not yet descend into class bodies.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub id: NodeId,
    pub ident: Ident,
    pub span: Span,
}

/// Enum declaration. Members are declared as const aliases; the enum name
/// itself is not declared.
#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub id: NodeId,
    pub ident: Ident,
    pub members: Vec<EnumMember>,
    pub span: Span,
}

/// Enum member with its synthesized value expression.
#[derive(Debug, Clone)]
pub struct EnumMember {
    pub ident: Ident,
    pub value: Expr,
    pub module: ModuleId,
    pub span: Span,
}

/// Print statement.
#[derive(Debug, Clone)]
pub struct PrintStmt {
    pub id: NodeId,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// Return statement.
#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub id: NodeId,
    pub arg: Option<Expr>,
    /// Number of scope levels between this return and its enclosing
    /// function level. Filled in by the analyzer; consumed by codegen to
    /// emit the stack-unwinding count.
    pub unwind_levels: u32,
    /// True for the `return null` the analyzer appends to function bodies
    /// that do not end in a return.
    pub synthetic: bool,
    pub span: Span,
}

/// If statement.
#[derive(Debug, Clone)]
pub struct IfStmt {
    pub id: NodeId,
    pub cond: Expr,
    pub cons: BlockStmt,
    pub alt: Option<Box<Stmt>>,
    pub span: Span,
}

/// For statement (`for (init; cond; update) { ... }`).
#[derive(Debug, Clone)]
pub struct ForStmt {
    pub id: NodeId,
    pub init: Option<Box<Stmt>>,
    pub cond: Option<Expr>,
    pub update: Option<Expr>,
    pub body: BlockStmt,
    pub span: Span,
}

/// While statement.
#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub id: NodeId,
    pub cond: Expr,
    pub body: BlockStmt,
    pub span: Span,
}

/// Try/catch statement.
#[derive(Debug, Clone)]
pub struct TryStmt {
    pub id: NodeId,
    pub block: BlockStmt,
    /// The caught exception binding.
    pub param: Ident,
    pub catch_block: BlockStmt,
    pub span: Span,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equals,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    LogicalAnd,
    LogicalOr,
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
}

impl BinOp {
    /// True for `=` and the compound assignment operators.
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            BinOp::Assign
                | BinOp::AddAssign
                | BinOp::SubtractAssign
                | BinOp::MultiplyAssign
                | BinOp::DivideAssign
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Negate,
}

/// Expressions in the AST.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A parenthesized expression. Literal classification unwraps exactly
    /// one of these layers before inspecting the inner node.
    Paren(ParenExpr),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Index(IndexExpr),
    Member(MemberExpr),
    ModuleAccess(ModuleAccessExpr),
    Var(VarExpr),
    Int(IntLit),
    Float(FloatLit),
    Str(StrLit),
    Bool(BoolLit),
    Null(NullLit),
    SelfRef(SelfExpr),
    New(NewExpr),
    FuncExpr(FuncExpr),
    Call(CallExpr),
    Object(ObjectExpr),
    Range(RangeExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Paren(e) => e.span.clone(),
            Expr::Binary(e) => e.span.clone(),
            Expr::Unary(e) => e.span.clone(),
            Expr::Index(e) => e.span.clone(),
            Expr::Member(e) => e.span.clone(),
            Expr::ModuleAccess(e) => e.span.clone(),
            Expr::Var(e) => e.span.clone(),
            Expr::Int(e) => e.span.clone(),
            Expr::Float(e) => e.span.clone(),
            Expr::Str(e) => e.span.clone(),
            Expr::Bool(e) => e.span.clone(),
            Expr::Null(e) => e.span.clone(),
            Expr::SelfRef(e) => e.span.clone(),
            Expr::New(e) => e.span.clone(),
            Expr::FuncExpr(e) => e.span.clone(),
            Expr::Call(e) => e.span.clone(),
            Expr::Object(e) => e.span.clone(),
            Expr::Range(e) => e.span.clone(),
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            Expr::Paren(e) => e.id,
            Expr::Binary(e) => e.id,
            Expr::Unary(e) => e.id,
            Expr::Index(e) => e.id,
            Expr::Member(e) => e.id,
            Expr::ModuleAccess(e) => e.id,
            Expr::Var(e) => e.id,
            Expr::Int(e) => e.id,
            Expr::Float(e) => e.id,
            Expr::Str(e) => e.id,
            Expr::Bool(e) => e.id,
            Expr::Null(e) => e.id,
            Expr::SelfRef(e) => e.id,
            Expr::New(e) => e.id,
            Expr::FuncExpr(e) => e.id,
            Expr::Call(e) => e.id,
            Expr::Object(e) => e.id,
            Expr::Range(e) => e.id,
        }
    }

    /// Unwrap a single parenthesized-expression layer, if present.
    pub fn unwrap_paren(&self) -> &Expr {
        match self {
            Expr::Paren(p) => &p.inner,
            other => other,
        }
    }

    /// True if this expression is an integer, float, or string literal.
    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Int(_) | Expr::Float(_) | Expr::Str(_))
    }

    /// Attribute probe used by the assignment rules. Only function
    /// expressions carry attributes today.
    pub fn has_attribute(&self, name: &str) -> bool {
        match self {
            Expr::FuncExpr(f) => f.attributes.iter().any(|a| a == name),
            Expr::Paren(p) => p.inner.has_attribute(name),
            _ => false,
        }
    }
}

/// Parenthesized expression.
#[derive(Debug, Clone)]
pub struct ParenExpr {
    pub id: NodeId,
    pub inner: Box<Expr>,
    pub span: Span,
}

/// Binary operation.
#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub id: NodeId,
    pub op: BinOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub span: Span,
}

/// Unary operation.
#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub id: NodeId,
    pub op: UnOp,
    pub expr: Box<Expr>,
    pub span: Span,
}

/// Array access (`a[i]`).
#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub id: NodeId,
    pub obj: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

/// Member access (`a.b`). The right child is a variable, call, or a nested
/// member access.
#[derive(Debug, Clone)]
pub struct MemberExpr {
    pub id: NodeId,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub module: ModuleId,
    pub span: Span,
}

/// Explicit module-qualified access (`Mod::item`).
#[derive(Debug, Clone)]
pub struct ModuleAccessExpr {
    pub id: NodeId,
    pub module_name: Ident,
    pub item: Box<Expr>,
    pub span: Span,
}

/// A variable reference. The annotation fields are filled in during
/// resolution by copying from the resolved symbol.
#[derive(Debug, Clone)]
pub struct VarExpr {
    pub id: NodeId,
    pub ident: Ident,
    pub module: ModuleId,
    pub is_const: bool,
    pub is_literal: bool,
    pub is_alias: bool,
    /// Declaration site of the aliased target, when `is_alias` is set.
    pub alias_to: Option<NodeId>,
    /// Best-known value of the variable at this point, for inlining.
    pub current_value: Option<Box<Expr>>,
    pub symbol: Option<SymbolId>,
    pub owner_level: i32,
    pub field_index: i32,
    pub span: Span,
}

impl VarExpr {
    pub fn new(ident: Ident, span: Span) -> Self {
        Self {
            id: NodeId::UNSET,
            ident,
            module: ModuleId::ROOT,
            is_const: false,
            is_literal: false,
            is_alias: false,
            alias_to: None,
            current_value: None,
            symbol: None,
            owner_level: -1,
            field_index: -1,
            span,
        }
    }
}

/// Integer literal.
#[derive(Debug, Clone)]
pub struct IntLit {
    pub id: NodeId,
    pub value: i64,
    pub span: Span,
}

/// Float literal.
#[derive(Debug, Clone)]
pub struct FloatLit {
    pub id: NodeId,
    pub value: f64,
    pub span: Span,
}

/// String literal.
#[derive(Debug, Clone)]
pub struct StrLit {
    pub id: NodeId,
    pub value: String,
    pub span: Span,
}

/// Boolean literal (`true` / `false`).
#[derive(Debug, Clone)]
pub struct BoolLit {
    pub id: NodeId,
    pub value: bool,
    pub span: Span,
}

/// Null literal.
#[derive(Debug, Clone)]
pub struct NullLit {
    pub id: NodeId,
    pub span: Span,
}

/// `self` expression.
#[derive(Debug, Clone)]
pub struct SelfExpr {
    pub id: NodeId,
    pub span: Span,
}

/// `new` expression.
#[derive(Debug, Clone)]
pub struct NewExpr {
    pub id: NodeId,
    pub target: Box<Expr>,
    pub span: Span,
}

/// Anonymous function expression.
#[derive(Debug, Clone)]
pub struct FuncExpr {
    pub id: NodeId,
    pub params: Vec<Ident>,
    pub body: BlockStmt,
    pub attributes: Vec<String>,
    pub span: Span,
}

/// A function call. The callee is resolved by name through the scope
/// stack; `definition` points back to the resolved declaration.
#[derive(Debug, Clone)]
pub struct CallExpr {
    pub id: NodeId,
    pub callee: Ident,
    pub args: Vec<Expr>,
    pub module: ModuleId,
    pub is_alias: bool,
    pub alias_to: Option<NodeId>,
    pub definition: Option<NodeId>,
    pub span: Span,
}

impl CallExpr {
    pub fn new(callee: Ident, args: Vec<Expr>, span: Span) -> Self {
        Self {
            id: NodeId::UNSET,
            callee,
            args,
            module: ModuleId::ROOT,
            is_alias: false,
            alias_to: None,
            definition: None,
            span,
        }
    }
}

/// Object literal expression (`${ key: value, ... }`).
#[derive(Debug, Clone)]
pub struct ObjectExpr {
    pub id: NodeId,
    pub members: Vec<(Ident, Expr)>,
    pub span: Span,
}

/// Range expression (`a .. b`).
#[derive(Debug, Clone)]
pub struct RangeExpr {
    pub id: NodeId,
    pub start: Box<Expr>,
    pub end: Box<Expr>,
    pub span: Span,
}

/// Compute a `SourceLocation` for a byte offset within `source`.
///
/// Diagnostics carry resolved line/column positions; AST nodes carry byte
/// spans and resolve through this on demand.
pub fn locate(source: &str, file: &str, offset: usize) -> SourceLocation {
    let mut line = 1u32;
    let mut col = 1u32;
    for (idx, ch) in source.char_indices() {
        if idx >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    SourceLocation::new(line, col, file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_maps_offsets_to_lines_and_columns() {
        let src = "let a = 1;\nlet b = 2;\n";
        assert_eq!(locate(src, "t.rye", 0), SourceLocation::new(1, 1, "t.rye"));
        assert_eq!(locate(src, "t.rye", 4), SourceLocation::new(1, 5, "t.rye"));
        assert_eq!(
            locate(src, "t.rye", 11),
            SourceLocation::new(2, 1, "t.rye")
        );
        assert_eq!(
            locate(src, "t.rye", 15),
            SourceLocation::new(2, 5, "t.rye")
        );
    }

    #[test]
    fn unwrap_paren_removes_exactly_one_layer() {
        let lit = Expr::Int(IntLit {
            id: NodeId::UNSET,
            value: 7,
            span: 0..1,
        });
        let once = Expr::Paren(ParenExpr {
            id: NodeId::UNSET,
            inner: Box::new(lit.clone()),
            span: 0..3,
        });
        let twice = Expr::Paren(ParenExpr {
            id: NodeId::UNSET,
            inner: Box::new(once.clone()),
            span: 0..5,
        });
        assert!(once.unwrap_paren().is_literal());
        assert!(!twice.unwrap_paren().is_literal());
    }
}
