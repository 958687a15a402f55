//! Registros de x86-64 y pool de scratch.

use std::fmt;

/// Registro scratch de evaluación de expresiones.
///
/// Los tres son callee-saved: el prólogo de toda función los
/// preserva, por lo que los valores intermedios sobreviven a
/// llamadas anidadas sin trabajo adicional.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reg {
    Rbx,
    R12,
    R13,
}

impl Reg {
    /// Obtiene la forma de 32 bits del registro.
    pub fn as_dword(self) -> &'static str {
        use Reg::*;

        match self {
            Rbx => "ebx",
            R12 => "r12d",
            R13 => "r13d",
        }
    }

    /// Obtiene la forma de 8 bits del registro.
    pub fn as_byte(self) -> &'static str {
        use Reg::*;

        match self {
            Rbx => "bl",
            R12 => "r12b",
            R13 => "r13b",
        }
    }

    fn index(self) -> usize {
        use Reg::*;

        match self {
            Rbx => 0,
            R12 => 1,
            R13 => 2,
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Reg::*;

        let name = match self {
            Rbx => "rbx",
            R12 => "r12",
            R13 => "r13",
        };

        formatter.write_str(name)
    }
}

/// La ABI coloca los primeros 6 argumentos enteros en registros;
/// el lenguaje no admite más.
pub const MAX_ARGS: usize = 6;

/// Registros de argumento en forma de 32 bits, en orden de ABI.
pub const ARG_DWORD: [&str; MAX_ARGS] = ["edi", "esi", "edx", "ecx", "r8d", "r9d"];

/// Registros de argumento en forma de 64 bits, en orden de ABI.
pub const ARG_QWORD: [&str; MAX_ARGS] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];

const FILE: [Reg; 3] = [Reg::Rbx, Reg::R12, Reg::R13];

/// Pool de asignación de registros scratch.
///
/// Cuando los tres registros están ocupados, el valor excedente
/// viaja por la pila de la máquina: quien evalúa hace push del
/// resultado y quien consume hace pop. Ese protocolo de spill es
/// el caso `None` en el tipo de retorno de [`Pool::alloc`].
#[derive(Default)]
pub struct Pool {
    used: [bool; 3],
}

impl Pool {
    /// Retorna el primer registro libre y lo marca ocupado, o
    /// `None` si los tres están ocupados.
    pub fn alloc(&mut self) -> Option<Reg> {
        let reg = FILE.into_iter().find(|reg| !self.used[reg.index()])?;
        self.used[reg.index()] = true;

        Some(reg)
    }

    /// Marca un registro como libre.
    pub fn free(&mut self, reg: Reg) {
        self.used[reg.index()] = false;
    }
}
