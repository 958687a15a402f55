//! Generación de código x86-64 en sintaxis Intel.
//!
//! # Modelo de evaluación
//! Las expresiones se evalúan sobre un pool de tres registros
//! scratch callee-saved (`rbx`, `r12`, `r13`). Evaluar una
//! expresión retorna el registro que contiene el resultado o, si
//! los tres estaban ocupados, `None`: el valor quedó en la pila de
//! la máquina mediante `push`, y quien consume lo recupera con
//! `pop`. Los operadores binarios materializan sus operandos en
//! `eax` y `ecx` y dejan el resultado en `eax`.
//!
//! # Marco de pila
//! Cada variable y cada parámetro reciben una celda de 8 bytes por
//! debajo de los registros scratch preservados, que ocupan
//! `[rbp - 8 .. rbp - 24]`. Los valores son enteros de 32 bits
//! escritos en los 4 bytes bajos de su celda con `DWORD PTR`. Una
//! redeclaración sombrea a la anterior: la celda vieja no se
//! reclama, solo se pierde su nombre.
//!
//! # Epílogo centralizado
//! Toda sentencia `return` materializa su valor en `eax` y salta a
//! una única etiqueta de epílogo por función, donde se restauran
//! pila y registros preservados. Las etiquetas se numeran con un
//! contador único para todo el módulo, por lo que nunca colisionan
//! entre funciones.
//!
//! # Convención de llamada
//! System-V AMD64 para los primeros seis argumentos enteros
//! (`rdi`, `rsi`, `rdx`, `rcx`, `r8`, `r9`); el valor de retorno
//! viaja en `eax`. Más de seis parámetros o argumentos es un error
//! de generación.

pub mod regs;

use crate::ast::{BinaryOp, Block, Expr, Function, Program, Stmt, UnaryOp};
use regs::{Pool, Reg, ARG_DWORD, ARG_QWORD, MAX_ARGS};
use std::collections::HashMap;
use thiserror::Error;

/// Error de generación de código.
///
/// A diferencia de los errores de las fases anteriores, estos no
/// llevan ubicación: los nodos del árbol no conservan posiciones
/// originales.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    /// El programa no define una función `main`.
    #[error("No entry found")]
    NoEntry,

    /// Una función declara más parámetros de los que caben en
    /// registros de argumento.
    #[error("Function '{0}' has more than 6 parameters")]
    TooManyParameters(String),

    /// Una llamada pasa más argumentos de los que caben en
    /// registros de argumento.
    #[error("Call to '{0}' has more than 6 arguments")]
    TooManyArguments(String),

    /// Se leyó o asignó una variable sin declaración previa.
    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),
}

/// Genera el texto ensamblador de un programa completo.
pub fn generate(program: &Program) -> Result<String, CodegenError> {
    Codegen::default().generate(program)
}

/// Estado del generador.
///
/// El contador de etiquetas es único para todo el módulo; el resto
/// de los campos se reinicia al entrar a cada función.
struct Codegen {
    lines: Vec<String>,
    label_counter: u32,

    var_offsets: HashMap<String, i32>,
    next_var_offset: i32,
    regs: Pool,
    epilogue_label: String,
}

impl Default for Codegen {
    fn default() -> Self {
        Codegen {
            lines: Vec::new(),
            label_counter: 2,
            var_offsets: HashMap::new(),
            next_var_offset: 0,
            regs: Pool::default(),
            epilogue_label: String::new(),
        }
    }
}

impl Codegen {
    fn generate(mut self, program: &Program) -> Result<String, CodegenError> {
        if !program.functions.iter().any(|f| f.name == "main") {
            return Err(CodegenError::NoEntry);
        }

        for function in &program.functions {
            self.function(function)?;
        }

        let mut output = String::from(".intel_syntax noprefix\n.global main\n\n");
        output.push_str(&self.lines.join("\n"));

        Ok(output)
    }

    /// Toma el siguiente valor del contador de etiquetas.
    fn label(&mut self) -> u32 {
        let label = self.label_counter;
        self.label_counter += 1;

        label
    }

    /// Coloca una etiqueta, sin indentación.
    fn place_label(&mut self, label: &str) {
        self.lines.push(format!("{}:", label));
    }

    /// Reserva una celda de 8 bytes para un nombre y retorna su
    /// offset relativo a `rbp`. Si el nombre ya existía, la celda
    /// anterior queda sombreada.
    fn reserve_slot(&mut self, name: &str) -> i32 {
        self.next_var_offset -= 8;
        self.var_offsets.insert(name.to_owned(), self.next_var_offset);
        emit!(self, "sub rsp, 8");

        self.next_var_offset
    }

    fn offset_of(&self, name: &str) -> Result<i32, CodegenError> {
        self.var_offsets
            .get(name)
            .copied()
            .ok_or_else(|| CodegenError::UndefinedVariable(name.to_owned()))
    }

    fn function(&mut self, function: &Function) -> Result<(), CodegenError> {
        if function.params.len() > MAX_ARGS {
            return Err(CodegenError::TooManyParameters(function.name.clone()));
        }

        // Estado por función
        self.var_offsets.clear();
        self.next_var_offset = -24; // rbx/r12/r13 ocupan [rbp-8 .. rbp-24]
        self.regs = Pool::default();
        self.epilogue_label = format!(".Lfunc_{}", self.label());

        self.place_label(&function.name);
        emit!(self, "push rbp");
        emit!(self, "mov rbp, rsp");
        emit!(self, "push rbx");
        emit!(self, "push r12");
        emit!(self, "push r13");

        // Los parámetros bajan de los registros de ABI a celdas
        // locales propias
        for (param, reg) in function.params.iter().zip(ARG_DWORD) {
            let offset = self.reserve_slot(param);
            emit!(self, "mov DWORD PTR [rbp + {}], {}", offset, reg);
        }

        self.block(&function.body)?;

        let epilogue = self.epilogue_label.clone();
        self.place_label(&epilogue);
        emit!(self, "lea rsp, [rbp - 24]");
        emit!(self, "pop r13");
        emit!(self, "pop r12");
        emit!(self, "pop rbx");
        emit!(self, "pop rbp");
        emit!(self, "ret");

        Ok(())
    }

    fn block(&mut self, block: &Block) -> Result<(), CodegenError> {
        for statement in &block.statements {
            self.statement(statement)?;
        }

        Ok(())
    }

    fn statement(&mut self, statement: &Stmt) -> Result<(), CodegenError> {
        match statement {
            Stmt::Return(value) => {
                match self.expr(value)? {
                    Some(reg) => {
                        emit!(self, "mov eax, {}", reg.as_dword());
                        self.regs.free(reg);
                    }

                    None => emit!(self, "pop rax"),
                }

                emit!(self, "jmp {}", self.epilogue_label);
            }

            Stmt::VarDecl { name, init } => {
                let offset = self.reserve_slot(name);

                if let Some(init) = init {
                    let reg = self.expr(init)?;
                    self.store(offset, reg);
                }
            }

            Stmt::Assignment { name, value } => {
                let reg = self.expr(value)?;
                let offset = self.offset_of(name)?;
                self.store(offset, reg);
            }

            Stmt::If {
                condition,
                then_block,
            } => {
                let else_label = format!(".L{}", self.label());
                let end_label = format!(".L{}", self.label());

                self.test_condition(condition)?;
                emit!(self, "je {}", else_label);

                self.block(then_block)?;
                emit!(self, "jmp {}", end_label);

                // No hay rama else: ambas etiquetas van juntas
                self.place_label(&else_label);
                self.place_label(&end_label);
            }

            Stmt::While { condition, body } => {
                let loop_label = format!(".L{}", self.label());
                let end_label = format!(".L{}", self.label());

                self.place_label(&loop_label);
                self.test_condition(condition)?;
                emit!(self, "je {}", end_label);

                self.block(body)?;
                emit!(self, "jmp {}", loop_label);

                self.place_label(&end_label);
            }

            Stmt::Block(block) => self.block(block)?,

            Stmt::Expr(expr) => match self.expr(expr)? {
                Some(reg) => self.regs.free(reg),
                None => emit!(self, "pop rax"),
            },
        }

        Ok(())
    }

    /// Escribe el resultado de una expresión en una celda local.
    fn store(&mut self, offset: i32, reg: Option<Reg>) {
        match reg {
            Some(reg) => {
                emit!(self, "mov DWORD PTR [rbp + {}], {}", offset, reg.as_dword());
                self.regs.free(reg);
            }

            None => {
                emit!(self, "pop rax");
                emit!(self, "mov DWORD PTR [rbp + {}], eax", offset);
            }
        }
    }

    /// Evalúa una condición y fija las banderas con `test`.
    fn test_condition(&mut self, condition: &Expr) -> Result<(), CodegenError> {
        match self.expr(condition)? {
            Some(reg) => {
                emit!(self, "test {0}, {0}", reg.as_dword());
                self.regs.free(reg);
            }

            None => {
                emit!(self, "pop rax");
                emit!(self, "test eax, eax");
            }
        }

        Ok(())
    }

    /// Evalúa una expresión. Retorna el registro scratch que
    /// contiene el resultado, o `None` si quedó en la pila.
    fn expr(&mut self, expr: &Expr) -> Result<Option<Reg>, CodegenError> {
        match expr {
            Expr::IntLiteral(value) => match self.regs.alloc() {
                Some(reg) => {
                    emit!(self, "mov {}, {}", reg.as_dword(), value);
                    Ok(Some(reg))
                }

                None => {
                    emit!(self, "push {}", value);
                    Ok(None)
                }
            },

            Expr::Identifier(name) => {
                let offset = self.offset_of(name)?;

                match self.regs.alloc() {
                    Some(reg) => {
                        emit!(self, "mov {}, DWORD PTR [rbp + {}]", reg.as_dword(), offset);
                        Ok(Some(reg))
                    }

                    None => {
                        emit!(self, "mov eax, DWORD PTR [rbp + {}]", offset);
                        emit!(self, "push rax");
                        Ok(None)
                    }
                }
            }

            Expr::Unary { op, operand } => match self.expr(operand)? {
                // Con registro se opera en el lugar
                Some(reg) => {
                    match op {
                        UnaryOp::Negate => emit!(self, "neg {}", reg.as_dword()),
                        UnaryOp::Not => {
                            emit!(self, "test {0}, {0}", reg.as_dword());
                            emit!(self, "sete {}", reg.as_byte());
                            emit!(self, "movzx {}, {}", reg.as_dword(), reg.as_byte());
                        }
                    }

                    Ok(Some(reg))
                }

                // Operando en la pila: pasa por eax y regresa
                None => {
                    emit!(self, "pop rax");

                    match op {
                        UnaryOp::Negate => emit!(self, "neg eax"),
                        UnaryOp::Not => {
                            emit!(self, "test eax, eax");
                            emit!(self, "sete al");
                            emit!(self, "movzx eax, al");
                        }
                    }

                    emit!(self, "push rax");
                    Ok(None)
                }
            },

            Expr::Binary { op, left, right } => {
                // La evaluación del derecho puede forzar spill de lo
                // que el izquierdo dejó en registros; el protocolo de
                // pila lo absorbe
                let left = self.expr(left)?;
                let right = self.expr(right)?;

                // El derecho se pushed de último, se saca primero
                match right {
                    Some(reg) => {
                        emit!(self, "mov ecx, {}", reg.as_dword());
                        self.regs.free(reg);
                    }

                    None => emit!(self, "pop rcx"),
                }

                match left {
                    Some(reg) => {
                        emit!(self, "mov eax, {}", reg.as_dword());
                        self.regs.free(reg);
                    }

                    None => emit!(self, "pop rax"),
                }

                self.binary_op(*op);

                // El resultado quedó en eax
                match self.regs.alloc() {
                    Some(reg) => {
                        emit!(self, "mov {}, eax", reg.as_dword());
                        Ok(Some(reg))
                    }

                    None => {
                        emit!(self, "push rax");
                        Ok(None)
                    }
                }
            }

            Expr::Call { name, args } => {
                if args.len() > MAX_ARGS {
                    return Err(CodegenError::TooManyArguments(name.clone()));
                }

                // Cada argumento se evalúa y queda en la pila de
                // inmediato, liberando su registro
                for arg in args {
                    if let Some(reg) = self.expr(arg)? {
                        emit!(self, "push {}", reg);
                        self.regs.free(reg);
                    }
                }

                // En orden inverso, para que el primero caiga en rdi
                for index in (0..args.len()).rev() {
                    emit!(self, "pop {}", ARG_QWORD[index]);
                }

                emit!(self, "call {}", name);

                match self.regs.alloc() {
                    Some(reg) => {
                        emit!(self, "mov {}, eax", reg.as_dword());
                        Ok(Some(reg))
                    }

                    None => {
                        emit!(self, "push rax");
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Emite la secuencia de un operador binario sobre `(eax, ecx)`.
    /// El resultado queda en `eax`.
    fn binary_op(&mut self, op: BinaryOp) {
        match op {
            BinaryOp::Add => emit!(self, "add eax, ecx"),
            BinaryOp::Sub => emit!(self, "sub eax, ecx"),
            BinaryOp::Mul => emit!(self, "imul eax, ecx"),

            BinaryOp::Div => {
                emit!(self, "cdq");
                emit!(self, "idiv ecx");
            }

            BinaryOp::Eq => self.compare_and_set("sete"),
            BinaryOp::Ne => self.compare_and_set("setne"),
            BinaryOp::Lt => self.compare_and_set("setl"),
            BinaryOp::Gt => self.compare_and_set("setg"),

            // Sin cortocircuito: ambos operandos ya fueron evaluados
            BinaryOp::And => {
                emit!(self, "test eax, eax");
                emit!(self, "setne al");
                emit!(self, "test ecx, ecx");
                emit!(self, "setne cl");
                emit!(self, "and al, cl");
                emit!(self, "movzx eax, al");
            }

            BinaryOp::Or => {
                emit!(self, "or eax, ecx");
                emit!(self, "test eax, eax");
                emit!(self, "setne al");
                emit!(self, "movzx eax, al");
            }
        }
    }

    fn compare_and_set(&mut self, set: &str) {
        emit!(self, "cmp eax, ecx");
        emit!(self, "{} al", set);
        emit!(self, "movzx eax, al");
    }
}
