//! Kind tags for declarations, syntax nodes, doc nodes, and types.
//!
//! Kind tags are plain `Copy` enums. They are the only structural
//! vocabulary a handle is allowed to persist besides strings and integers.

use std::fmt;

/// Kind of a declaration.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum DeclKind {
    Package,
    Module,
    Class,
    Interface,
    Enum,
    AnnotationType,
    Record,
    Method,
    Constructor,
    Field,
    EnumConstant,
    RecordComponent,
    StaticInit,
    InstanceInit,
    TypeParameter,
    Parameter,
    LocalVariable,
    ExceptionParameter,
    ResourceVariable,
    BindingVariable,
    /// A symbol that could only be resolved approximately, such as the
    /// placeholder behind an erroneous type reference.
    Other,
}

impl DeclKind {
    /// Class, interface, enum, annotation type, or record.
    #[inline]
    pub const fn is_type(self) -> bool {
        matches!(
            self,
            DeclKind::Class
                | DeclKind::Interface
                | DeclKind::Enum
                | DeclKind::AnnotationType
                | DeclKind::Record
        )
    }

    #[inline]
    pub const fn is_executable(self) -> bool {
        matches!(self, DeclKind::Method | DeclKind::Constructor)
    }

    #[inline]
    pub const fn is_field(self) -> bool {
        matches!(
            self,
            DeclKind::Field | DeclKind::EnumConstant | DeclKind::RecordComponent
        )
    }

    #[inline]
    pub const fn is_initializer(self) -> bool {
        matches!(self, DeclKind::StaticInit | DeclKind::InstanceInit)
    }

    /// Variables that only exist inside a method body.
    #[inline]
    pub const fn is_local(self) -> bool {
        matches!(
            self,
            DeclKind::Parameter
                | DeclKind::LocalVariable
                | DeclKind::ExceptionParameter
                | DeclKind::ResourceVariable
                | DeclKind::BindingVariable
        )
    }

    /// Lower-case name used in diagnostics and `Display`.
    pub const fn name(self) -> &'static str {
        match self {
            DeclKind::Package => "package",
            DeclKind::Module => "module",
            DeclKind::Class => "class",
            DeclKind::Interface => "interface",
            DeclKind::Enum => "enum",
            DeclKind::AnnotationType => "annotation type",
            DeclKind::Record => "record",
            DeclKind::Method => "method",
            DeclKind::Constructor => "constructor",
            DeclKind::Field => "field",
            DeclKind::EnumConstant => "enum constant",
            DeclKind::RecordComponent => "record component",
            DeclKind::StaticInit => "static initializer",
            DeclKind::InstanceInit => "instance initializer",
            DeclKind::TypeParameter => "type parameter",
            DeclKind::Parameter => "parameter",
            DeclKind::LocalVariable => "local variable",
            DeclKind::ExceptionParameter => "exception parameter",
            DeclKind::ResourceVariable => "resource variable",
            DeclKind::BindingVariable => "binding variable",
            DeclKind::Other => "other",
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of a syntax-tree node.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum NodeKind {
    CompilationUnit,
    Package,
    Import,
    Class,
    Interface,
    Enum,
    AnnotationType,
    Record,
    Modifiers,
    Annotation,
    TypeParameter,
    Method,
    Variable,
    Block,
    // Type syntax
    PrimitiveType,
    Identifier,
    MemberSelect,
    ParameterizedType,
    ArrayType,
    UnboundedWildcard,
    ExtendsWildcard,
    SuperWildcard,
    /// Type of a `var` local, synthesised by the front end.
    InferredType,
    // Statements
    ExpressionStatement,
    Return,
    If,
    EmptyStatement,
    // Expressions
    MethodInvocation,
    NewClass,
    Assignment,
    Binary,
    Unary,
    Parenthesized,
    IntLiteral,
    StringLiteral,
    CharLiteral,
    BooleanLiteral,
    NullLiteral,
    /// Placeholder for input the parser could not make sense of.
    Erroneous,
}

impl NodeKind {
    /// Class-like declaration nodes.
    #[inline]
    pub const fn is_type_declaration(self) -> bool {
        matches!(
            self,
            NodeKind::Class
                | NodeKind::Interface
                | NodeKind::Enum
                | NodeKind::AnnotationType
                | NodeKind::Record
        )
    }

    /// Nodes that may introduce a declaration worth anchoring a path on.
    #[inline]
    pub const fn is_declaration(self) -> bool {
        self.is_type_declaration() || matches!(self, NodeKind::Method | NodeKind::Variable)
    }
}

/// Kind of a documentation-comment node.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum DocKind {
    DocComment,
    Text,
    Param,
    Return,
    Throws,
    See,
    Since,
    Author,
    UnknownBlockTag,
    Link,
    Code,
    Reference,
    Identifier,
    Erroneous,
}

/// Primitive type kinds.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Char,
    Float,
    Double,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Char,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Single-character descriptor code.
    pub const fn descriptor(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
        }
    }

    pub const fn keyword(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.keyword() == keyword)
    }
}

/// Kind of a type instance.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    Void,
    None,
    Null,
    Array,
    Declared,
    Error,
    TypeVar,
    Wildcard,
    Executable,
    Package,
    Module,
    Union,
    Intersection,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Primitive(p) => f.write_str(p.keyword()),
            TypeKind::Void => f.write_str("void"),
            TypeKind::None => f.write_str("none"),
            TypeKind::Null => f.write_str("null"),
            TypeKind::Array => f.write_str("array"),
            TypeKind::Declared => f.write_str("declared"),
            TypeKind::Error => f.write_str("error"),
            TypeKind::TypeVar => f.write_str("type variable"),
            TypeKind::Wildcard => f.write_str("wildcard"),
            TypeKind::Executable => f.write_str("executable"),
            TypeKind::Package => f.write_str("package"),
            TypeKind::Module => f.write_str("module"),
            TypeKind::Union => f.write_str("union"),
            TypeKind::Intersection => f.write_str("intersection"),
        }
    }
}
