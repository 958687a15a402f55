//! Optimización del árbol de sintaxis.
//!
//! Pase opcional que reescribe el programa conservando su
//! semántica para toda entrada que termina sin atrapar y que no
//! divide entre cero. Se aplican dos reescrituras:
//!
//! - **Plegado de constantes**, en post-orden: toda subexpresión
//!   cuyo valor se conoce en tiempo de compilación se reemplaza por
//!   el literal resultante. La aritmética es de 32 bits en
//!   complemento a dos. Una división entre el literal cero nunca se
//!   pliega, lo cual preserva la trampa en tiempo de ejecución.
//! - **Eliminación de ramas muertas**: un `if` cuya condición plegó
//!   a una constante se reemplaza por su bloque (condición distinta
//!   de cero) o se elimina por completo (condición cero).
//!
//! Los lazos `while` se optimizan por dentro pero jamás se eliminan
//! ni se desenrollan: sin análisis de flujo de datos no es posible
//! probar que una condición aparentemente constante lo siga siendo
//! tras ejecutar el cuerpo.
//!
//! El pase es un punto fijo: aplicarlo más de una vez no produce
//! cambios adicionales.

use crate::ast::{BinaryOp, Block, Expr, Program, Stmt, UnaryOp};

/// Optimiza un programa en el lugar.
pub fn optimize(program: &mut Program) {
    for function in &mut program.functions {
        opt_block(&mut function.body);
    }
}

/// Optimiza cada sentencia de un bloque. Una sentencia puede
/// producir cero, una o más sentencias de reemplazo.
fn opt_block(block: &mut Block) {
    let statements = std::mem::take(&mut block.statements);

    for stmt in statements {
        opt_stmt(stmt, &mut block.statements);
    }
}

fn opt_stmt(stmt: Stmt, out: &mut Vec<Stmt>) {
    match stmt {
        Stmt::VarDecl { name, mut init } => {
            if let Some(expr) = &mut init {
                fold_expr(expr);
            }

            out.push(Stmt::VarDecl { name, init });
        }

        Stmt::Assignment { name, mut value } => {
            fold_expr(&mut value);
            out.push(Stmt::Assignment { name, value });
        }

        Stmt::Return(mut value) => {
            fold_expr(&mut value);
            out.push(Stmt::Return(value));
        }

        Stmt::If {
            mut condition,
            mut then_block,
        } => {
            // Primero la condición, luego el interior del bloque
            let folded = fold_expr(&mut condition);
            opt_block(&mut then_block);

            match folded {
                // Siempre falsa: la sentencia desaparece
                Some(0) => (),

                // Siempre verdadera: el bloque se promueve
                Some(_) => out.push(Stmt::Block(then_block)),

                None => out.push(Stmt::If {
                    condition,
                    then_block,
                }),
            }
        }

        Stmt::While {
            mut condition,
            mut body,
        } => {
            fold_expr(&mut condition);
            opt_block(&mut body);
            out.push(Stmt::While { condition, body });
        }

        Stmt::Block(mut block) => {
            opt_block(&mut block);
            out.push(Stmt::Block(block));
        }

        Stmt::Expr(mut expr) => {
            fold_expr(&mut expr);
            out.push(Stmt::Expr(expr));
        }
    }
}

/// Pliega una expresión en post-orden. Retorna el valor si la
/// expresión completa es constante; en ese caso el nodo ya fue
/// reemplazado por el literal correspondiente.
fn fold_expr(expr: &mut Expr) -> Option<i32> {
    let value = match expr {
        Expr::IntLiteral(value) => return Some(*value),

        Expr::Identifier(_) => return None,

        // Una llamada nunca es constante, pero sus argumentos se
        // pliegan por dentro
        Expr::Call { args, .. } => {
            for arg in args {
                fold_expr(arg);
            }

            return None;
        }

        Expr::Unary { op, operand } => {
            let operand = fold_expr(operand)?;

            match op {
                UnaryOp::Negate => operand.wrapping_neg(),
                UnaryOp::Not => (operand == 0) as i32,
            }
        }

        Expr::Binary { op, left, right } => {
            let left = fold_expr(left);
            let right = fold_expr(right);

            let (l, r) = match (left, right) {
                (Some(l), Some(r)) => (l, r),
                _ => return None,
            };

            match op {
                BinaryOp::Add => l.wrapping_add(r),
                BinaryOp::Sub => l.wrapping_sub(r),
                BinaryOp::Mul => l.wrapping_mul(r),

                // `x / 0` se deja sin plegar para preservar la
                // trampa en tiempo de ejecución
                BinaryOp::Div if r == 0 => return None,
                BinaryOp::Div => l.wrapping_div(r),

                BinaryOp::Eq => (l == r) as i32,
                BinaryOp::Ne => (l != r) as i32,
                BinaryOp::Lt => (l < r) as i32,
                BinaryOp::Gt => (l > r) as i32,

                // Evaluación ansiosa sobre veracidad entera; el
                // lenguaje no tiene cortocircuito
                BinaryOp::And => (l != 0 && r != 0) as i32,
                BinaryOp::Or => (l != 0 || r != 0) as i32,
            }
        }
    };

    *expr = Expr::IntLiteral(value);

    Some(value)
}
