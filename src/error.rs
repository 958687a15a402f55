//! Diagnósticos unificados de la compilación.
//!
//! Cada fase define su propio tipo de error; este módulo los reúne
//! en un único tipo que el driver imprime en una línea. Los errores
//! sintácticos llevan la ubicación del token ofensor; los de
//! generación de código no, porque los nodos del árbol ya no
//! conservan posiciones originales.

use crate::{codegen::CodegenError, parse::ParserError, source::Located};
use thiserror::Error;

/// Error de cualquier fase de la compilación.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CompileError {
    /// El análisis sintáctico rechazó el programa.
    #[error("Parse error [{}]: {}", .0.location(), .0.val())]
    Parse(#[from] Located<ParserError>),

    /// La generación de código rechazó el programa.
    #[error("Codegen error: {0}")]
    Codegen(#[from] CodegenError),
}
