use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::environment::Environment;
use crate::error::{NoxError, Result};
use crate::expr::{Expr, SiteId};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::{Class, Function, Instance, Value};

/// How a statement finished. `return`/`break`/`continue` thread through
/// here instead of unwinding; every frame between the site and its target
/// sees the flow and restores its environment on the way out.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Tree-walking evaluator. Owns the globals frame (pre-seeded with the
/// `clock` native), the current environment, and the resolver's distance
/// side-table. Generic over the sink that receives `print` output so runs
/// can be observed in-process.
pub struct Interpreter<W: Write = Stdout> {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<SiteId, usize>,
    output: W,
}

impl Interpreter<Stdout> {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    pub fn with_output(output: W) -> Self {
        let globals: Rc<RefCell<Environment>> = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: clock_native,
            },
        );

        Interpreter {
            globals: Rc::clone(&globals),
            environment: globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Reclaim the output sink; lets tests read captured `print` output.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Called by the resolver for every reference site it binds locally.
    pub fn resolve(&mut self, site: SiteId, depth: usize) {
        debug!("Recording site {} at depth {}", site, depth);

        self.locals.insert(site, depth);
    }

    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        for statement in statements {
            // The resolver rejects top-level return/break/continue, so only
            // Normal can surface here.
            self.execute(statement)?;
        }

        Ok(())
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.output, "{}", value)?;

                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));

                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    match self.execute(body)? {
                        Flow::Normal | Flow::Continue => {}

                        Flow::Break => break,

                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                // The header gets its own frame for the loop variable.
                let previous: Rc<RefCell<Environment>> = Rc::clone(&self.environment);

                self.environment = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &previous,
                ))));

                let result = self.run_for(
                    initializer.as_deref(),
                    condition.as_ref(),
                    increment.as_ref(),
                    body,
                );

                self.environment = previous;

                result
            }

            Stmt::Break(_) => Ok(Flow::Break),

            Stmt::Continue(_) => Ok(Flow::Continue),

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Ok(Flow::Return(value))
            }

            Stmt::Function(decl) => {
                let function = Function::new(Rc::clone(decl), Rc::clone(&self.environment), false);

                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));

                Ok(Flow::Normal)
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.execute_class_decl(name, superclass.as_ref(), methods)?;

                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` inside `environment`, restoring the previous frame
    /// on every exit path: fall-through, unwind flows, and errors.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: Environment) -> Result<Flow> {
        let previous: Rc<RefCell<Environment>> = Rc::clone(&self.environment);

        self.environment = Rc::new(RefCell::new(environment));

        let mut result: Result<Flow> = Ok(Flow::Normal);

        for statement in statements {
            result = self.execute(statement);

            match &result {
                Ok(Flow::Normal) => {}
                _ => break,
            }
        }

        self.environment = previous;

        result
    }

    fn run_for(
        &mut self,
        initializer: Option<&Stmt>,
        condition: Option<&Expr>,
        increment: Option<&Expr>,
        body: &Stmt,
    ) -> Result<Flow> {
        if let Some(init) = initializer {
            self.execute(init)?;
        }

        loop {
            if let Some(cond) = condition {
                if !is_truthy(&self.evaluate(cond)?) {
                    break;
                }
            }

            match self.execute(body)? {
                // A continued iteration still runs the increment below.
                Flow::Normal | Flow::Continue => {}

                Flow::Break => return Ok(Flow::Normal),

                Flow::Return(value) => return Ok(Flow::Return(value)),
            }

            if let Some(inc) = increment {
                self.evaluate(inc)?;
            }
        }

        Ok(Flow::Normal)
    }

    fn execute_class_decl(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        let superclass: Option<Rc<Class>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),

                _ => {
                    let line = match expr {
                        Expr::Variable { name, .. } => name.line,
                        _ => name.line,
                    };

                    return Err(NoxError::runtime(line, "Superclass must be a class."));
                }
            },

            None => None,
        };

        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        // Methods close over a frame holding `super` when there is a
        // superclass; the resolver's scope stack assumes this exact shape.
        let previous: Rc<RefCell<Environment>> = Rc::clone(&self.environment);

        if let Some(ref class) = superclass {
            self.environment = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                &previous,
            ))));

            self.environment
                .borrow_mut()
                .define("super", Value::Class(Rc::clone(class)));
        }

        let mut method_table: HashMap<String, Rc<Function>> = HashMap::new();

        for method in methods {
            let is_initializer = method.name.lexeme == "init";

            let function = Function::new(
                Rc::clone(method),
                Rc::clone(&self.environment),
                is_initializer,
            );

            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = Class::new(name.lexeme.clone(), superclass, method_table);

        self.environment = previous;

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(Rc::new(class)), name.line)
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(token) => self.evaluate_literal(token),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val: Value = self.evaluate(left)?;

                match operator.token_type {
                    TokenType::OR if is_truthy(&left_val) => Ok(left_val),

                    TokenType::AND if !is_truthy(&left_val) => Ok(left_val),

                    _ => self.evaluate(right),
                }
            }

            Expr::Variable { name, site } => self.look_up_variable(name, *site),

            Expr::Assign { name, value, site } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(site) {
                    Some(&distance) => {
                        if !Environment::assign_at(
                            &self.environment,
                            distance,
                            &name.lexeme,
                            value.clone(),
                        ) {
                            return Err(NoxError::runtime(
                                name.line,
                                format!("Undefined variable '{}'.", name.lexeme),
                            ));
                        }
                    }

                    None => {
                        self.globals
                            .borrow_mut()
                            .assign(&name.lexeme, value.clone(), name.line)?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());

                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call_value(callee_val, args, paren.line)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    if let Some(value) = instance.borrow().field(&name.lexeme) {
                        return Ok(value);
                    }

                    let method = instance.borrow().class().find_method(&name.lexeme);

                    match method {
                        Some(method) => Ok(Value::Function(
                            method.bind(Value::Instance(Rc::clone(&instance))),
                        )),

                        None => Err(NoxError::runtime(
                            name.line,
                            format!("Undefined property '{}'.", name.lexeme),
                        )),
                    }
                }

                _ => Err(NoxError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value: Value = self.evaluate(value)?;

                    instance.borrow_mut().set_field(&name.lexeme, value.clone());

                    Ok(value)
                }

                _ => Err(NoxError::runtime(name.line, "Only instances have fields.")),
            },

            Expr::SelfExpr { keyword, site } => self.look_up_variable(keyword, *site),

            Expr::Super {
                keyword,
                method,
                site,
            } => {
                let distance: Option<usize> = self.locals.get(site).copied();

                let superclass: Rc<Class> = match distance
                    .and_then(|d| Environment::get_at(&self.environment, d, "super"))
                {
                    Some(Value::Class(class)) => class,

                    _ => {
                        return Err(NoxError::runtime(
                            keyword.line,
                            "Undefined variable 'super'.",
                        ))
                    }
                };

                // `self` lives one frame inside the `super` frame.
                let instance: Value = distance
                    .and_then(|d| d.checked_sub(1))
                    .and_then(|d| Environment::get_at(&self.environment, d, "self"))
                    .ok_or_else(|| {
                        NoxError::runtime(keyword.line, "Undefined variable 'self'.")
                    })?;

                match superclass.find_method(&method.lexeme) {
                    Some(found) => Ok(Value::Function(found.bind(instance))),

                    None => Err(NoxError::runtime(
                        method.line,
                        format!("Undefined property '{}'.", method.lexeme),
                    )),
                }
            }
        }
    }

    fn evaluate_literal(&self, token: &Token) -> Result<Value> {
        match &token.token_type {
            TokenType::NUMBER(n) => Ok(Value::Number(*n)),

            TokenType::STRING(s) => Ok(Value::String(s.clone())),

            TokenType::TRUE => Ok(Value::Bool(true)),

            TokenType::FALSE => Ok(Value::Bool(false)),

            TokenType::NIL => Ok(Value::Nil),

            _ => Err(NoxError::runtime(token.line, "Invalid literal.")),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value> {
        let value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(NoxError::runtime(
                    operator.line,
                    "Operand must be a number.",
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&value))),

            _ => Err(NoxError::runtime(operator.line, "Invalid unary operator.")),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        let left_val: Value = self.evaluate(left)?;
        let right_val: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(NoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(NoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::STAR => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(NoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            // Division follows IEEE-754; dividing by zero yields an
            // infinity or NaN, never an error.
            TokenType::SLASH => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

                _ => Err(NoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::GREATER => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(NoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::GREATER_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(NoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::LESS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(NoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::LESS_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(NoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            _ => Err(NoxError::runtime(operator.line, "Invalid binary operator.")),
        }
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>, line: usize) -> Result<Value> {
        match callee {
            Value::NativeFunction { arity, func, .. } => {
                if args.len() != arity {
                    return Err(arity_error(line, arity, args.len()));
                }

                func(&args)
            }

            Value::Function(function) => {
                if args.len() != function.arity() {
                    return Err(arity_error(line, function.arity(), args.len()));
                }

                self.call_function(&function, args)
            }

            Value::Class(class) => {
                if args.len() != class.arity() {
                    return Err(arity_error(line, class.arity(), args.len()));
                }

                self.instantiate(class, args)
            }

            _ => Err(NoxError::runtime(
                line,
                "Can only call functions and classes.",
            )),
        }
    }

    fn call_function(&mut self, function: &Function, args: Vec<Value>) -> Result<Value> {
        let mut environment = Environment::with_enclosing(Rc::clone(function.closure()));

        for (param, arg) in function.declaration().params.iter().zip(args) {
            environment.define(&param.lexeme, arg);
        }

        let flow: Flow = self.execute_block(&function.declaration().body, environment)?;

        // An initializer evaluates to its bound instance no matter how the
        // body exits.
        if function.is_initializer() {
            return Environment::get_at(function.closure(), 0, "self").ok_or_else(|| {
                NoxError::runtime(
                    function.declaration().name.line,
                    "Undefined variable 'self'.",
                )
            });
        }

        match flow {
            Flow::Return(value) => Ok(value),

            _ => Ok(Value::Nil),
        }
    }

    fn instantiate(&mut self, class: Rc<Class>, args: Vec<Value>) -> Result<Value> {
        let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(&class))));

        if let Some(initializer) = class.find_method("init") {
            let bound = initializer.bind(Value::Instance(Rc::clone(&instance)));

            self.call_function(&bound, args)?;
        }

        Ok(Value::Instance(instance))
    }

    fn look_up_variable(&self, name: &Token, site: SiteId) -> Result<Value> {
        match self.locals.get(&site) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme)
                .ok_or_else(|| {
                    NoxError::runtime(
                        name.line,
                        format!("Undefined variable '{}'.", name.lexeme),
                    )
                }),

            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,

        Value::Bool(b) => *b,

        _ => true,
    }
}

fn arity_error(line: usize, expected: usize, got: usize) -> NoxError {
    NoxError::runtime(
        line,
        format!("Expected {} arguments but got {}.", expected, got),
    )
}

fn clock_native(_args: &[Value]) -> Result<Value> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| NoxError::runtime(0, format!("Clock error: {}", e)))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}
