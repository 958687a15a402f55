//! Árbol de sintaxis abstracta.
//!
//! Cada categoría de nodo es un tipo suma cuyos hijos son poseídos
//! en exclusiva por su padre. No existen referencias compartidas ni
//! ciclos, por lo cual basta con `Box` para los hijos recursivos y
//! el árbol completo se libera al soltar el [`Program`].
//!
//! La estructura es jerárquica:
//!
//! ```text
//! programa
//! └── funciones
//!      └── bloque de sentencias [declaración | return | if | while | bloque]
//!           └── expresiones
//! ```
//!
//! El parser construye estos nodos, el optimizador los reemplaza por
//! subárboles equivalentes y el generador de código los consume. Todo
//! valor del lenguaje es un entero de 32 bits con signo.

/// Operador unario.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Negate,

    /// `!x`, produce `1` si el operando es cero y `0` si no.
    Not,
}

/// Operador binario. `&&` y `||` evalúan siempre ambos operandos;
/// el lenguaje no tiene cortocircuito.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Gt,
    And,
    Or,
}

/// Una expresión: código que se reduce a un valor.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Constante entera.
    IntLiteral(i32),

    /// Lectura de una variable.
    Identifier(String),

    /// Operación unaria sobre un operando poseído.
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Operación binaria sobre operandos poseídos. Se evalúa primero
    /// el izquierdo y luego el derecho.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Llamada a función con argumentos en orden de evaluación.
    Call { name: String, args: Vec<Expr> },
}

/// Una sentencia: código que controla la ejecución.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    /// Declaración de variable con inicializador opcional.
    VarDecl { name: String, init: Option<Expr> },

    /// Asignación a una variable ya declarada.
    Assignment { name: String, value: Expr },

    /// Retorno del valor de la función.
    Return(Expr),

    /// Condicional sin rama `else`.
    If { condition: Expr, then_block: Block },

    /// Lazo con condición al inicio.
    While { condition: Expr, body: Block },

    /// Bloque anidado.
    Block(Block),

    /// Expresión cuyo valor se descarta.
    Expr(Expr),
}

/// Una secuencia de sentencias que se ejecuta en orden.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

/// Una función definida en el programa.
///
/// Los parámetros se registran solo por nombre: el único tipo del
/// lenguaje es el entero de 32 bits, por lo que la anotación `int`
/// que exige la gramática no aporta información al árbol.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
}

/// Un programa completo: la lista de funciones en orden de aparición.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Program {
    pub functions: Vec<Function>,
}
