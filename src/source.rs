//! Rastreo de ubicaciones en código fuente.
//!
//! Los objetos internos que el compilador construye a partir del
//! texto de entrada llevan cuenta de la posición original donde
//! aparecen, lo cual permite señalar un punto exacto cuando una
//! fase posterior encuentra un error.

use std::fmt::{self, Debug, Display, Formatter};

/// Una posición línea-columna en el texto fuente. Ambos campos
/// comienzan en 1.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Location {
    line: u32,
    column: u32,
}

impl Location {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Location {
        Location {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Incrementa el número de línea y regresa a la columna 1.
    pub fn newline(self) -> Location {
        Location {
            line: self.line + 1,
            column: 1,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location { line: 1, column: 1 }
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T: Display> Display for Located<T> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} [{}]", self.value, self.location)
    }
}

impl<E: std::error::Error> std::error::Error for Located<E> {}
