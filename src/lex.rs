//! Análisis léxico.
//!
//! # Tokenización
//! Esta es la primera fase del compilador. Descompone el texto fuente
//! en unidades léxicas denominadas tokens. Los espacios en blanco se
//! descartan durante esta operación. Cada token emitido queda asociado
//! a la ubicación de su primer carácter, lo cual permite rastrear
//! errores tanto en esta fase como en constructos más elevados de
//! fases posteriores.
//!
//! # Contenido de un token
//! Todo token conserva su lexema: una vista prestada del buffer
//! fuente. El parser materializa strings propios a partir de estos
//! lexemas al construir nodos del árbol, por lo que el buffer fuente
//! debe sobrevivir a los tokens pero no al árbol.
//!
//! # Errores
//! El lexer nunca falla. Un byte que no pertenece al lenguaje se
//! emite como token de clase [`TokenKind::Unknown`] y es el parser
//! quien decide si eso es fatal, lo cual ocurre apenas el token
//! aparece donde se requería uno con significado.

use crate::source::Location;
use std::{
    fmt::{self, Display},
    iter::Peekable,
    str::{CharIndices, FromStr},
};

/// Clase de un token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Fin del texto fuente.
    Eof,

    /// Byte que no inicia ningún token del lenguaje.
    Unknown,

    /// Constante entera decimal.
    IntLiteral,

    /// Identificador.
    Identifier,

    /// Palabra clave.
    Keyword(Keyword),

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `/`
    Slash,

    /// `=`
    Assign,

    /// `<`
    Less,

    /// `>`
    Greater,

    /// `!`
    Not,

    /// `;`
    Semicolon,

    /// `,`
    Comma,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `{`
    OpenCurly,

    /// `}`
    CloseCurly,

    /// `==`
    Equals,

    /// `!=`
    NotEquals,

    /// `&&`
    And,

    /// `||`
    Or,
}

impl Display for TokenKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;

        match self {
            Eof => fmt.write_str("end of file"),
            Unknown => fmt.write_str("unknown character"),
            IntLiteral => fmt.write_str("integer literal"),
            Identifier => fmt.write_str("identifier"),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Plus => fmt.write_str("`+`"),
            Minus => fmt.write_str("`-`"),
            Times => fmt.write_str("`*`"),
            Slash => fmt.write_str("`/`"),
            Assign => fmt.write_str("`=`"),
            Less => fmt.write_str("`<`"),
            Greater => fmt.write_str("`>`"),
            Not => fmt.write_str("`!`"),
            Semicolon => fmt.write_str("`;`"),
            Comma => fmt.write_str("`,`"),
            OpenParen => fmt.write_str("`(`"),
            CloseParen => fmt.write_str("`)`"),
            OpenCurly => fmt.write_str("`{`"),
            CloseCurly => fmt.write_str("`}`"),
            Equals => fmt.write_str("`==`"),
            NotEquals => fmt.write_str("`!=`"),
            And => fmt.write_str("`&&`"),
            Or => fmt.write_str("`||`"),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Int,
    Return,
    If,
    While,
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Keyword::*;

        let string = match self {
            Int => "int",
            Return => "return",
            If => "if",
            While => "while",
        };

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        use Keyword::*;

        const KEYWORDS: &[(&str, Keyword)] = &[
            ("int", Int),
            ("return", Return),
            ("if", If),
            ("while", While),
        ];

        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Objeto resultante del análisis léxico.
///
/// El lexema es el fragmento exacto del buffer fuente que conforma
/// al token. Solo el token [`TokenKind::Eof`] tiene lexema vacío.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub location: Location,
    pub lexeme: &'a str,
}

/// Escáner del texto fuente.
///
/// El lexer avanza carácter por carácter sobre el buffer de entrada,
/// manteniendo la posición línea-columna del siguiente carácter sin
/// consumir. Es infalible: toda entrada produce una secuencia de
/// tokens terminada por exactamente un token de fin de archivo.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    location: Location,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Crea un lexer en estado inicial sobre un buffer fuente.
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            chars: source.char_indices().peekable(),
            location: Location::default(),
            finished: false,
        }
    }

    /// Reduce la entrada completa a una secuencia de tokens.
    pub fn tokenize(self) -> Vec<Token<'a>> {
        self.collect()
    }

    /// Construye el siguiente token.
    fn lex(&mut self) -> Token<'a> {
        use TokenKind::*;

        self.skip_whitespace();

        let location = self.location;
        let (start, c) = match self.chars.peek() {
            Some(&next) => next,
            None => {
                return Token {
                    kind: Eof,
                    location,
                    lexeme: "",
                }
            }
        };

        let kind = match c {
            '0'..='9' => self.scan_integer(),
            'a'..='z' | 'A'..='Z' | '_' => return self.scan_word(start, location),

            '+' => self.single(Plus),
            '-' => self.single(Minus),
            '*' => self.single(Times),
            '/' => self.single(Slash),
            '<' => self.single(Less),
            '>' => self.single(Greater),
            ';' => self.single(Semicolon),
            ',' => self.single(Comma),
            '(' => self.single(OpenParen),
            ')' => self.single(CloseParen),
            '{' => self.single(OpenCurly),
            '}' => self.single(CloseCurly),

            // Operadores de dos caracteres antes que los de uno
            '=' => self.single_or_double(Assign, '=', Equals),
            '!' => self.single_or_double(Not, '=', NotEquals),
            '&' => self.single_or_double(Unknown, '&', And),
            '|' => self.single_or_double(Unknown, '|', Or),

            _ => self.single(Unknown),
        };

        let end = self.offset();
        Token {
            kind,
            location,
            lexeme: &self.source[start..end],
        }
    }

    /// Descarta espacios en blanco. Un salto de línea avanza la línea
    /// y regresa a la columna 1; cualquier otro espacio avanza una
    /// columna, incluyendo tabuladores y retornos de carro.
    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                ' ' | '\t' | '\r' | '\x0b' | '\x0c' | '\n' => self.bump(),
                _ => break,
            };
        }
    }

    /// Constante entera: la corrida más larga de dígitos.
    fn scan_integer(&mut self) -> TokenKind {
        while let Some(&(_, c)) = self.chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }

            self.bump();
        }

        TokenKind::IntLiteral
    }

    /// Término que puede ser un identificador o una palabra clave.
    fn scan_word(&mut self, start: usize, location: Location) -> Token<'a> {
        while let Some(&(_, c)) = self.chars.peek() {
            if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }

            self.bump();
        }

        let end = self.offset();
        let lexeme = &self.source[start..end];
        let kind = match Keyword::from_str(lexeme) {
            Ok(keyword) => TokenKind::Keyword(keyword),
            Err(()) => TokenKind::Identifier,
        };

        Token {
            kind,
            location,
            lexeme,
        }
    }

    /// Consume un carácter y emite la clase indicada.
    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    /// Consume un carácter y, si el siguiente es `second`, lo consume
    /// también y emite `double`; de lo contrario emite `single`.
    fn single_or_double(&mut self, single: TokenKind, second: char, double: TokenKind) -> TokenKind {
        self.bump();

        match self.chars.peek() {
            Some(&(_, c)) if c == second => {
                self.bump();
                double
            }

            _ => single,
        }
    }

    /// Consume el siguiente carácter, actualizando la posición.
    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        self.location = match c {
            '\n' => self.location.newline(),
            _ => self.location.advance(),
        };

        Some(c)
    }

    /// Offset en bytes del siguiente carácter sin consumir.
    fn offset(&mut self) -> usize {
        match self.chars.peek() {
            Some(&(index, _)) => index,
            None => self.source.len(),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let token = self.lex();
        self.finished = token.kind == TokenKind::Eof;

        Some(token)
    }
}
