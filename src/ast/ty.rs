use crate::lexer::FilePosition;

/// A syntactic type annotation, resolved to a `Type` by the type checker.
#[derive(Debug, Clone)]
pub struct TypeNode {
    pub kind: TypeNodeKind,
    pub position: FilePosition,
}

impl TypeNode {
    pub fn new(kind: TypeNodeKind, position: FilePosition) -> Self {
        Self { kind, position }
    }

    pub fn sexp(&self) -> String {
        match &self.kind {
            TypeNodeKind::Int => "(IntType)".to_string(),
            TypeNodeKind::Float => "(FloatType)".to_string(),
            TypeNodeKind::Bool => "(BoolType)".to_string(),
            TypeNodeKind::String => "(StringType)".to_string(),
            TypeNodeKind::Array(base) => format!("(ArrayType {})", base.sexp()),
            TypeNodeKind::Tuple(parts) => {
                let parts: Vec<_> = parts.iter().map(TypeNode::sexp).collect();
                format!("(TupleType {})", parts.join(" "))
            }
            TypeNodeKind::Function { params, ret } => {
                let params: Vec<_> = params.iter().map(TypeNode::sexp).collect();
                format!("(FunctionType ({}) {})", params.join(" "), ret.sexp())
            }
            TypeNodeKind::Alias(name) => format!("(AliasType {name})"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TypeNodeKind {
    Int,
    Float,
    Bool,
    String,
    Array(Box<TypeNode>),
    Tuple(Vec<TypeNode>),
    Function {
        params: Vec<TypeNode>,
        ret: Box<TypeNode>,
    },
    Alias(String),
}
