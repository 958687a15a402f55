//! Compilador de un subconjunto de C a ensamblador x86-64.
//!
//! La tubería de compilación es estrictamente secuencial y cada
//! fase materializa su salida completa antes de la siguiente:
//!
//! ```text
//! texto fuente → tokens → árbol → (árbol optimizado) → ensamblador
//! ```
//!
//! El [`Lexer`](lex::Lexer) presta lexemas del buffer fuente; el
//! [`parser`](parse::parse) construye un árbol etiquetado con
//! strings propios; el [`optimizador`](optimize::optimize) pliega
//! constantes y poda ramas muertas en el lugar; y el
//! [`generador`](codegen::generate) emite texto ensamblador en
//! sintaxis Intel para un ensamblador System-V AMD64 externo.

#[macro_use]
mod macros;

pub mod ast;
pub mod codegen;
pub mod error;
pub mod lex;
pub mod optimize;
pub mod parse;
pub mod source;

pub use error::CompileError;

/// Compila un buffer fuente a texto ensamblador.
///
/// Esta es la fachada de la tubería completa. El pase de
/// optimización es opcional y siempre preserva la semántica del
/// programa.
pub fn compile(source: &str, optimizations: bool) -> Result<String, CompileError> {
    let tokens = lex::Lexer::new(source).tokenize();
    let mut program = parse::parse(&tokens)?;

    if optimizations {
        optimize::optimize(&mut program);
    }

    Ok(codegen::generate(&program)?)
}
