//! Message dispatch and AST evaluation (§4.4 "Message send", §4.5 "Method
//! lookup and `super`").
//!
//! A native method runs in its *caller's* activation rather than getting a
//! frame of its own (`Interpreter::invoke` returns before pushing one), so a
//! primitive like `on:do:` sees the activation that sent it as the top of
//! the stack. That is what lets `exception.rs` use "the current activation's
//! home" as the target for `retry`/`return:` without synthesizing anything
//! extra.

use std::rc::Rc;

use crate::{
    activation::{Activation, Frame, HomeContext},
    ast::{Expr, Literal, SuperKind},
    control::{RunResult, Unwind},
    error::ErrorKind,
    heap::{BlockObject, HeapData, HeapId, MergedMethod},
    interpreter::Interpreter,
    value::{Integer, Value},
};

/// Signature every primitive method is stored and called as. `args` excludes
/// the receiver, which is passed separately.
pub type NativeFn = fn(&mut Interpreter, Value, &[Value]) -> RunResult<Value>;

/// Ceiling on activation depth per process (§7 `StackOverflow`); the teacher
/// has no equivalent since its sandboxed scripts bound recursion by CPU
/// quota instead, but an AST-walking interpreter recurses through the native
/// Rust stack one frame per activation and must protect it explicitly.
pub const DEFAULT_STACK_DEPTH: usize = 10_000;

impl Interpreter {
    /// The class a value dispatches against. `Value::Class` dispatches
    /// class-side, everything else instance-side (§4.4).
    pub fn class_of(&self, value: &Value) -> RunResult<HeapId> {
        let name = match value {
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::Boolean(_) => "Boolean",
            Value::Nil => "UndefinedObject",
            Value::String(_) => "String",
            Value::Symbol(_) => "Symbol",
            Value::Array(_) => "Array",
            Value::Table(_) => "Table",
            Value::Block(_) => "Block",
            Value::Class(id) => return Ok(*id),
            Value::Instance(id) => {
                let HeapData::Instance(inst) = self.heap.get(*id) else {
                    unreachable!("Value::Instance always points at an InstanceObject")
                };
                return Ok(inst.class);
            }
        };
        self.globals.get(name).and_then(|v| match v {
            Value::Class(id) => Some(id),
            _ => None,
        }).ok_or_else(|| Unwind::signal(ErrorKind::Error, format!("core class '{name}' is not bootstrapped"), Value::Nil))
    }

    /// Resolves the class whose merged table lookup should start, honouring
    /// `super`/`super<Parent>` (§4.5). `defining_class` is the class that
    /// owns the method (or lexically encloses the block) currently running.
    fn lookup_root(&self, receiver_class: HeapId, scope: Option<&SuperKind>, defining_class: Option<&str>) -> RunResult<HeapId> {
        match scope {
            None => Ok(receiver_class),
            Some(SuperKind::Super) => {
                let owner = defining_class.ok_or_else(|| {
                    Unwind::signal(ErrorKind::Error, "super used outside any method", Value::Nil)
                })?;
                let owner_id = self.heap.find_class_by_name(owner).ok_or_else(|| {
                    Unwind::signal(ErrorKind::Error, format!("unknown defining class '{owner}'"), Value::Nil)
                })?;
                self.heap.class(owner_id).superclasses.first().copied().ok_or_else(|| {
                    Unwind::signal(ErrorKind::Error, format!("{owner} has no superclass for 'super'"), Value::Nil)
                })
            }
            Some(SuperKind::Scoped(parent)) => self.heap.find_class_by_name(parent).ok_or_else(|| {
                Unwind::signal(ErrorKind::NameError, format!("unknown class '{parent}' in super<{parent}>"), Value::Nil)
            }),
        }
    }

    /// Looks up `selector` in `root`'s merged table (instance-side unless
    /// `receiver` is itself a `Value::Class`, per §4.4) without sending it.
    fn resolve_method(&self, root: HeapId, selector: &str, class_side: bool) -> Option<MergedMethod> {
        let class = self.heap.class(root);
        let table = if class_side { &class.merged_class_methods } else { &class.merged_methods };
        table.get(selector).cloned()
    }

    /// Sends `selector` to `receiver` (§4.4). This is the single entry point
    /// every `Expr::MessageSend` and every primitive that sends messages
    /// back into user code (`do:`, `on:do:`, ...) goes through.
    pub fn send(
        &mut self,
        receiver: Value,
        selector: &str,
        args: &[Value],
        super_scope: Option<&SuperKind>,
        defining_class: Option<&str>,
    ) -> RunResult<Value> {
        let class_side = matches!(receiver, Value::Class(_)) && super_scope.is_none();
        let receiver_class = self.class_of(&receiver)?;
        let root = self.lookup_root(receiver_class, super_scope, defining_class)?;

        match self.resolve_method(root, selector, class_side) {
            Some(MergedMethod::Unique(method)) => {
                if method.arity() != args.len() {
                    return Err(Unwind::signal(
                        ErrorKind::ArityError,
                        format!("{selector} expects {} argument(s), got {}", method.arity(), args.len()),
                        Value::Nil,
                    ));
                }
                self.invoke(receiver, &method, args)
            }
            Some(MergedMethod::Ambiguous { contributors }) => Err(Unwind::signal(
                ErrorKind::AmbiguousMethod,
                format!("{selector} is ambiguous between {}", contributors.join(", ")),
                Value::Nil,
            )),
            None => self.does_not_understand(receiver, selector, args),
        }
    }

    /// Falls back to a user-overridable `doesNotUnderstand:` before giving
    /// up with `MessageNotUnderstood` (§4.4 "Failure mode").
    fn does_not_understand(&mut self, receiver: Value, selector: &str, args: &[Value]) -> RunResult<Value> {
        let receiver_class = self.class_of(&receiver)?;
        let class_side = matches!(receiver, Value::Class(_));
        if let Some(MergedMethod::Unique(method)) = self.resolve_method(receiver_class, "doesNotUnderstand:", class_side) {
            let message = self.make_message(selector, args);
            return self.invoke(receiver, &method, std::slice::from_ref(&message));
        }
        Err(Unwind::signal(
            ErrorKind::MessageNotUnderstood,
            format!("{} does not understand '{selector}'", self.class_name_of_value(&receiver)),
            Value::Nil,
        ))
    }

    fn make_message(&mut self, selector: &str, args: &[Value]) -> Value {
        let array = self.heap.allocate(HeapData::Array(args.to_vec()));
        let mut table = indexmap::IndexMap::new();
        table.insert(Rc::from("selector"), Value::Symbol(Rc::from(selector)));
        table.insert(Rc::from("arguments"), Value::Array(array));
        Value::Table(self.heap.allocate(HeapData::Table(table)))
    }

    #[must_use]
    pub fn class_name_of_value(&self, value: &Value) -> String {
        self.class_of(value).map_or_else(|_| value.class_name().to_owned(), |id| self.heap.class(id).name.clone())
    }

    /// Pushes a fresh activation for `method`, runs its body, and pops it.
    /// Intercepts a `NonLocalReturn` targeting exactly this activation; any
    /// other unwind (a return meant for an outer activation, a block's
    /// `BlockContextExpired`, an in-flight signal) passes straight through
    /// (§4.6).
    pub fn invoke(&mut self, receiver: Value, method: &Rc<crate::heap::Method>, args: &[Value]) -> RunResult<Value> {
        if let Some(native) = method.native {
            return native(self, receiver, args);
        }
        if self.stack_depth() >= self.stack_limit {
            return Err(Unwind::signal(ErrorKind::StackOverflow, "activation depth exceeded", Value::Nil));
        }

        let sender = self.current_activation_id();
        let frame = Frame::root(receiver.clone());
        for (param, arg) in method.params.iter().zip(args) {
            Frame::declare(&frame, param, arg.clone());
        }
        for temp in &method.temporaries {
            Frame::declare(&frame, temp, Value::Nil);
        }
        let activation = Activation::new(sender, receiver, method.selector.clone(), frame, Some(method.owner.clone()));
        let this_id = activation.id;
        let home = activation.home_context();
        self.push_activation(activation);

        let result = self.eval_sequence(&method.body, &home);

        self.pop_activation();
        match result {
            Ok(v) => Ok(v),
            Err(Unwind::NonLocalReturn { home: target, value }) if target.activation == this_id => Ok(value),
            Err(other) => Err(other),
        }
    }

    /// Invokes a block closure (§4.6). Arity must match exactly; a block
    /// whose home activation has already returned raises
    /// `BlockContextExpired` the moment its body attempts a `^`, not at
    /// invocation time, since a block with no `^` in it is still perfectly
    /// callable after its home has returned (it just can't use non-local
    /// return).
    pub fn invoke_block(&mut self, block_id: HeapId, args: &[Value]) -> RunResult<Value> {
        let (params, temporaries, body, captured_frame, home, defining_class) = {
            let HeapData::Block(b) = self.heap.get(block_id) else {
                return Err(Unwind::signal(ErrorKind::TypeError, "not a block", Value::Nil));
            };
            (b.params.clone(), b.temporaries.clone(), Rc::clone(&b.body), Rc::clone(&b.captured_frame), b.home.clone(), b.defining_class.clone())
        };
        if params.len() != args.len() {
            return Err(Unwind::signal(
                ErrorKind::ArityError,
                format!("block expects {} argument(s), got {}", params.len(), args.len()),
                Value::Nil,
            ));
        }
        if self.stack_depth() >= self.stack_limit {
            return Err(Unwind::signal(ErrorKind::StackOverflow, "activation depth exceeded", Value::Nil));
        }

        let self_value = Frame::self_value(&captured_frame);
        let frame = Frame::child(self_value.clone(), captured_frame);
        for (param, arg) in params.iter().zip(args) {
            Frame::declare(&frame, param, arg.clone());
        }
        for temp in &temporaries {
            Frame::declare(&frame, temp, Value::Nil);
        }
        let sender = self.current_activation_id();
        let activation = Activation::new(sender, self_value, "block".to_owned(), frame, defining_class);
        self.push_activation(activation);

        let result = self.eval_sequence(&body, &home);
        self.pop_activation();
        result
    }

    /// Evaluates a statement sequence, returning the last statement's value
    /// (`Nil` for an empty sequence), per the naming rule and `^` handling
    /// threaded through `home` (§4.2, §4.6).
    pub fn eval_sequence(&mut self, body: &[Expr], home: &HomeContext) -> RunResult<Value> {
        let mut result = Value::Nil;
        for stmt in body {
            result = self.eval_expr(stmt, home)?;
        }
        Ok(result)
    }

    pub fn eval_expr(&mut self, expr: &Expr, home: &HomeContext) -> RunResult<Value> {
        match expr {
            Expr::Literal(lit) => Ok(self.eval_literal(lit)),
            Expr::Identifier(name) => self.resolve_name(name),
            Expr::Assign { name, value, .. } => {
                let v = self.eval_expr(value, home)?;
                if let Value::Class(id) = v {
                    if self.heap.class(id).name.is_empty() {
                        self.heap.class_mut(id).name = name.clone();
                    }
                }
                self.assign_name(name, v.clone())?;
                Ok(v)
            }
            Expr::MessageSend { receiver, selector, args, super_scope, cascades, .. } => {
                self.eval_message_send(receiver, selector, args, super_scope.as_ref(), cascades, home)
            }
            Expr::Block(block) => Ok(self.make_block(block, home)),
            Expr::Return { value, .. } => {
                let v = self.eval_expr(value, home)?;
                if !home.alive.get() {
                    return Err(Unwind::signal(ErrorKind::BlockContextExpired, "non-local return to an expired activation", Value::Nil));
                }
                Err(Unwind::NonLocalReturn { home: home.clone(), value: v })
            }
            Expr::ArrayLiteral(items) => {
                let values = items.iter().map(|e| self.eval_expr(e, home)).collect::<RunResult<Vec<_>>>()?;
                Ok(Value::Array(self.heap.allocate(HeapData::Array(values))))
            }
            Expr::TableLiteral(pairs) => {
                let mut table = indexmap::IndexMap::new();
                for (k, v) in pairs {
                    let key = self.eval_expr(k, home)?;
                    let key = self.table_key(&key)?;
                    let value = self.eval_expr(v, home)?;
                    table.insert(key, value);
                }
                Ok(Value::Table(self.heap.allocate(HeapData::Table(table))))
            }
            Expr::MethodDefinition { target_class, is_class_side, method } => {
                self.eval_method_definition(target_class, *is_class_side, method, home)
            }
        }
    }

    fn table_key(&self, key: &Value) -> RunResult<Rc<str>> {
        match key {
            Value::Symbol(s) | Value::String(s) => Ok(Rc::clone(s)),
            other => Err(Unwind::signal(ErrorKind::TypeError, format!("table keys must be strings or symbols, got {}", other.class_name()), Value::Nil)),
        }
    }

    fn eval_literal(&mut self, lit: &Literal) -> Value {
        match lit {
            Literal::Integer(n) => Value::Integer(Integer::Small(*n)),
            Literal::Float(f) => Value::Float(*f),
            Literal::String(s) => Value::String(Rc::from(s.as_str())),
            Literal::Symbol(s) => Value::Symbol(Rc::from(s.as_str())),
        }
    }

    fn make_block(&mut self, block: &crate::ast::Block, home: &HomeContext) -> Value {
        let captured_frame = self.current_frame();
        let defining_class = self.current_defining_class();
        let object = BlockObject {
            params: block.params.clone(),
            temporaries: block.temporaries.clone(),
            body: Rc::from(block.body.as_slice()),
            captured_frame,
            home: home.clone(),
            defining_class,
        };
        Value::Block(self.heap.allocate(HeapData::Block(object)))
    }

    /// Variable resolution: block/method locals and parameters, then
    /// instance slots (if `self` is an instance), then the global namespace
    /// (§4.2 "naming rule").
    fn resolve_name(&self, name: &str) -> RunResult<Value> {
        if name == "self" || name == "super" {
            return Ok(self.current_self());
        }
        if name == "thisContext" {
            return Ok(self.current_self());
        }
        if let Some(v) = Frame::lookup(&self.current_frame(), name) {
            return Ok(v);
        }
        if let Value::Instance(id) = self.current_self() {
            let HeapData::Instance(inst) = self.heap.get(id) else { unreachable!() };
            let class = self.heap.class(inst.class);
            if let Some(idx) = class.slot_index(name) {
                return Ok(inst.slots[idx].clone());
            }
        }
        self.globals.get(name).ok_or_else(|| Unwind::signal(ErrorKind::NameError, format!("unbound identifier '{name}'"), Value::Nil))
    }

    fn assign_name(&mut self, name: &str, value: Value) -> RunResult<()> {
        if Frame::assign(&self.current_frame(), name, value.clone()) {
            return Ok(());
        }
        if let Value::Instance(id) = self.current_self() {
            let class_id = {
                let HeapData::Instance(inst) = self.heap.get(id) else { unreachable!() };
                inst.class
            };
            let slot_idx = self.heap.class(class_id).slot_index(name);
            if let Some(idx) = slot_idx {
                let HeapData::Instance(inst) = self.heap.get_mut(id) else { unreachable!() };
                inst.slots[idx] = value;
                return Ok(());
            }
        }
        self.globals.set(name, value);
        Ok(())
    }

    fn eval_message_send(
        &mut self,
        receiver: &Expr,
        selector: &str,
        args: &[Expr],
        super_scope: Option<&SuperKind>,
        cascades: &[crate::ast::Cascade],
        home: &HomeContext,
    ) -> RunResult<Value> {
        let receiver_val = self.eval_expr(receiver, home)?;
        let arg_vals = args.iter().map(|a| self.eval_expr(a, home)).collect::<RunResult<Vec<_>>>()?;
        let defining_class = self.current_defining_class();
        let mut result = self.send(receiver_val.clone(), selector, &arg_vals, super_scope, defining_class.as_deref())?;
        for cascade in cascades {
            let cascade_args = cascade.args.iter().map(|a| self.eval_expr(a, home)).collect::<RunResult<Vec<_>>>()?;
            result = self.send(receiver_val.clone(), &cascade.selector, &cascade_args, None, defining_class.as_deref())?;
        }
        Ok(result)
    }

    fn eval_method_definition(&mut self, target_class: &Expr, is_class_side: bool, method: &crate::ast::MethodLiteral, home: &HomeContext) -> RunResult<Value> {
        let target = self.eval_expr(target_class, home)?;
        let Value::Class(id) = target else {
            return Err(Unwind::signal(ErrorKind::TypeError, "method definition target must be a class", Value::Nil));
        };
        let owner = self.heap.class(id).name.clone();
        let compiled = Rc::new(crate::heap::Method {
            selector: method.selector.clone(),
            params: method.params.clone(),
            temporaries: method.temporaries.clone(),
            body: Rc::from(method.body.as_slice()),
            native: None,
            owner,
        });
        if is_class_side {
            self.heap.class_mut(id).own_class_methods.insert(method.selector.clone(), compiled);
        } else {
            self.heap.class_mut(id).own_methods.insert(method.selector.clone(), compiled);
        }
        self.recompute_and_propagate(id);
        Ok(target)
    }

    /// Recomputes `id`'s merged tables and every existing subclass's,
    /// bottom-up, so a method or parent added to an already-subclassed class
    /// takes effect transitively (§10.5).
    pub fn recompute_and_propagate(&mut self, id: HeapId) {
        self.heap.recompute_merged(id);
        let mut subclasses = self.heap.subclasses_of(id);
        subclasses.sort_by_key(|&sub_id| self.ancestor_depth(sub_id));
        for sub_id in subclasses {
            self.heap.recompute_merged(sub_id);
        }
    }

    fn ancestor_depth(&self, id: HeapId) -> usize {
        let class = self.heap.class(id);
        class.superclasses.iter().map(|&sup| 1 + self.ancestor_depth(sup)).max().unwrap_or(0)
    }
}
