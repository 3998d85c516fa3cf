/// Expression typing for completion.
///
/// Completion needs the type of the expression left of `.`, `->`, `::`,
/// `(` or `SIGNAL(`.  That text is usually short (`m_list.at(0)->`) and
/// often part of a statement that does not parse yet, so instead of asking
/// tree-sitter we run a small recursive-descent evaluator over the line
/// lexer's tokens.  Every sub-expression evaluates to a list of
/// [`LookupItem`]s; an empty list means "unknown" and propagates upward
/// without error.
use ustr::Ustr;

use super::lookup::{AccessOp, BindingKind, LookupContext, LookupItem};
use super::symbols::{FullySpecifiedType, QualifiedName, ScopeKind, ScopeRef, SymbolKind, Ty};
use crate::lexer::{self, Token, TokenKind};

const CAST_KEYWORDS: &[&str] = &[
    "static_cast",
    "dynamic_cast",
    "reinterpret_cast",
    "const_cast",
    "qobject_cast",
];

impl LookupContext {
    /// Resolve `expression` as written in `scope`.
    ///
    /// The comma form `sender, SIGNAL` produced for Qt 4 connections
    /// resolves to the sender.
    pub fn resolve_expression(&self, expression: &str, scope: ScopeRef) -> Vec<LookupItem> {
        let tokens: Vec<Token> = lexer::tokenize_text(expression, lexer::LexState::Normal)
            .into_iter()
            .filter(|t| !t.is_comment())
            .collect();
        if tokens.is_empty() {
            return Vec::new();
        }
        let mut eval = Evaluator {
            ctx: self,
            src: expression,
            tokens: &tokens,
            pos: 0,
            scope,
        };
        eval.expression()
    }

    /// The class whose member function encloses `scope`, as the type of
    /// `this` (a pointer to that class).
    pub fn this_item(&self, scope: ScopeRef) -> Option<LookupItem> {
        let mut current = Some(scope);
        while let Some(s) = current {
            if self.scope(s).kind == ScopeKind::Function {
                let binding = self.binding_for_scope(s)?;
                if binding.kind != BindingKind::Class {
                    return None;
                }
                let class = binding.symbol?;
                return Some(LookupItem {
                    ty: FullySpecifiedType::from(Ty::Symbol(class)).pointer_to(),
                    scope: s,
                    declaration: None,
                    binding: Some(binding),
                });
            }
            if matches!(self.scope(s).kind, ScopeKind::Class | ScopeKind::Global) {
                return None;
            }
            current = self.parent_scope(s);
        }
        None
    }
}

struct Evaluator<'a> {
    ctx: &'a LookupContext,
    src: &'a str,
    tokens: &'a [Token],
    pos: usize,
    scope: ScopeRef,
}

impl<'a> Evaluator<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_text(&self) -> &'a str {
        self.peek().map(|t| t.text(self.src)).unwrap_or("")
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn bump(&mut self) -> Option<Token> {
        let tk = self.peek();
        if tk.is_some() {
            self.pos += 1;
        }
        tk
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Move just past the bracket matching the one at `self.pos`.
    fn skip_balanced(&mut self) {
        let (open, close) = match self.peek_kind() {
            Some(TokenKind::LParen) => (TokenKind::LParen, TokenKind::RParen),
            Some(TokenKind::LBracket) => (TokenKind::LBracket, TokenKind::RBracket),
            Some(TokenKind::LBrace) => (TokenKind::LBrace, TokenKind::RBrace),
            Some(TokenKind::Less) => (TokenKind::Less, TokenKind::Greater),
            _ => return,
        };
        let mut depth = 0usize;
        while let Some(tk) = self.bump() {
            if tk.kind == open {
                depth += 1;
            } else if tk.kind == close {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            } else if open == TokenKind::Less
                && tk.kind == TokenKind::Operator
                && tk.text(self.src) == ">>"
            {
                depth = depth.saturating_sub(2);
                if depth == 0 {
                    return;
                }
            }
        }
    }

    fn builtin(&self, name: &str) -> Vec<LookupItem> {
        vec![self.typed(FullySpecifiedType::builtin(name))]
    }

    fn typed(&self, ty: FullySpecifiedType) -> LookupItem {
        LookupItem {
            ty,
            scope: self.scope,
            declaration: None,
            binding: None,
        }
    }

    // ─── Grammar ────────────────────────────────────────────────────────

    fn expression(&mut self) -> Vec<LookupItem> {
        let mut result = self.assignment();
        while self.eat(TokenKind::Comma) {
            if matches!(self.peek_kind(), Some(TokenKind::Signal | TokenKind::Slot)) {
                return result;
            }
            result = self.assignment();
        }
        result
    }

    fn assignment(&mut self) -> Vec<LookupItem> {
        let left = self.conditional();
        if self.at(TokenKind::Operator) && is_assignment_op(self.peek_text()) {
            self.pos += 1;
            self.assignment();
        }
        left
    }

    fn conditional(&mut self) -> Vec<LookupItem> {
        let cond = self.binary();
        if self.eat(TokenKind::Question) {
            let then = self.expression();
            if self.eat(TokenKind::Colon) {
                self.assignment();
            }
            return then;
        }
        cond
    }

    fn binary(&mut self) -> Vec<LookupItem> {
        let mut left = self.unary();
        loop {
            let Some(tk) = self.peek() else {
                break;
            };
            let text = tk.text(self.src);
            let comparison = matches!(
                tk.kind,
                TokenKind::Less | TokenKind::Greater
            ) || matches!(text, "==" | "!=" | "<=" | ">=" | "&&" | "||");
            let arithmetic = matches!(
                tk.kind,
                TokenKind::Star | TokenKind::Slash | TokenKind::Amper
            ) || (tk.kind == TokenKind::Operator
                && matches!(text, "+" | "-" | "%" | "|" | "^" | "<<" | ">>"));
            if !comparison && !arithmetic {
                break;
            }
            self.pos += 1;
            let right = self.unary();
            if comparison {
                left = self.builtin("bool");
            } else if left.is_empty() {
                left = right;
            }
        }
        left
    }

    fn unary(&mut self) -> Vec<LookupItem> {
        let Some(tk) = self.peek() else {
            return Vec::new();
        };
        let text = tk.text(self.src);
        match tk.kind {
            TokenKind::Star => {
                self.pos += 1;
                let operand = self.unary();
                self.dereference(&operand)
            }
            TokenKind::Amper => {
                self.pos += 1;
                self.unary()
                    .into_iter()
                    .map(|item| LookupItem {
                        ty: item.ty.clone().pointer_to(),
                        ..item
                    })
                    .collect()
            }
            TokenKind::Tilde => {
                self.pos += 1;
                self.unary()
            }
            TokenKind::Operator if text == "!" => {
                self.pos += 1;
                self.unary();
                self.builtin("bool")
            }
            TokenKind::Operator if matches!(text, "-" | "+" | "++" | "--") => {
                self.pos += 1;
                self.unary()
            }
            TokenKind::Keyword if text == "new" => {
                self.pos += 1;
                self.new_expression()
            }
            TokenKind::Keyword if text == "delete" => {
                self.pos += 1;
                if self.at(TokenKind::LBracket) {
                    self.skip_balanced();
                }
                self.unary();
                self.builtin("void")
            }
            TokenKind::Keyword if matches!(text, "sizeof" | "alignof") => {
                self.pos += 1;
                if self.at(TokenKind::LParen) {
                    self.skip_balanced();
                } else {
                    self.unary();
                }
                vec![self.typed(named_type("size_t"))]
            }
            TokenKind::LParen => {
                if let Some(cast) = self.c_style_cast() {
                    return cast;
                }
                self.postfix()
            }
            _ => self.postfix(),
        }
    }

    /// `(Type) operand` when the parenthesized text is a known type.
    fn c_style_cast(&mut self) -> Option<Vec<LookupItem>> {
        let start = self.pos;
        self.skip_balanced();
        let end = self.pos;
        let inner = &self.tokens[start + 1..end.saturating_sub(1).max(start + 1)];
        let looks_like_type = !inner.is_empty()
            && inner.iter().all(|t| {
                matches!(
                    t.kind,
                    TokenKind::Identifier
                        | TokenKind::Keyword
                        | TokenKind::ColonColon
                        | TokenKind::Star
                        | TokenKind::Amper
                        | TokenKind::Less
                        | TokenKind::Greater
                        | TokenKind::Comma
                )
            });
        let operand_follows = matches!(
            self.peek_kind(),
            Some(
                TokenKind::Identifier
                    | TokenKind::Keyword
                    | TokenKind::LParen
                    | TokenKind::NumericLiteral
                    | TokenKind::StringLiteral
                    | TokenKind::CharLiteral
            )
        );
        if looks_like_type && operand_follows {
            let text = &self.src[inner[0].begin..inner[inner.len() - 1].end];
            let ty = FullySpecifiedType::parse(text);
            if self.is_type(&ty) {
                self.unary();
                return Some(vec![self.typed(ty)]);
            }
        }
        self.pos = start;
        None
    }

    fn is_type(&self, ty: &FullySpecifiedType) -> bool {
        match &ty.ty {
            Ty::Builtin(_) => true,
            Ty::Pointer(inner) | Ty::Reference(inner) | Ty::Array(inner) => self.is_type(inner),
            Ty::Named(named) => self
                .ctx
                .lookup_type_symbol(&named.name, self.scope)
                .is_some_and(|r| self.ctx.symbol(r).is_type_like()),
            _ => false,
        }
    }

    fn new_expression(&mut self) -> Vec<LookupItem> {
        // Placement arguments.
        if self.at(TokenKind::LParen) {
            self.skip_balanced();
        }
        let start = self.pos;
        while let Some(tk) = self.peek() {
            match tk.kind {
                TokenKind::Less => self.skip_balanced(),
                TokenKind::LParen | TokenKind::LBrace | TokenKind::Semicolon => break,
                TokenKind::Identifier
                | TokenKind::Keyword
                | TokenKind::ColonColon
                | TokenKind::Star => self.pos += 1,
                _ => break,
            }
        }
        if self.pos == start {
            return Vec::new();
        }
        let text = &self.src[self.tokens[start].begin..self.tokens[self.pos - 1].end];
        let ty = FullySpecifiedType::parse(text);
        if matches!(self.peek_kind(), Some(TokenKind::LParen | TokenKind::LBrace)) {
            self.skip_balanced();
        } else if self.at(TokenKind::LBracket) {
            self.skip_balanced();
        }
        vec![self.typed(ty.pointer_to())]
    }

    fn postfix(&mut self) -> Vec<LookupItem> {
        let mut items = self.primary();
        loop {
            let Some(tk) = self.peek() else {
                break;
            };
            match tk.kind {
                TokenKind::Dot | TokenKind::Arrow => {
                    self.pos += 1;
                    let access = if tk.kind == TokenKind::Dot {
                        AccessOp::Dot
                    } else {
                        AccessOp::Arrow
                    };
                    // `~Name` after an access operator names a destructor.
                    self.eat(TokenKind::Tilde);
                    let Some(name) = self.bump().filter(|t| t.kind == TokenKind::Identifier)
                    else {
                        return Vec::new();
                    };
                    if self.at(TokenKind::Less) && self.template_args_follow() {
                        self.skip_balanced();
                    }
                    items = self.member(&items, access, name.text(self.src));
                }
                TokenKind::LParen => {
                    self.skip_balanced();
                    items = self.call(&items);
                }
                TokenKind::LBracket => {
                    self.skip_balanced();
                    items = self.subscript(&items);
                }
                TokenKind::Operator if matches!(tk.text(self.src), "++" | "--") => {
                    self.pos += 1;
                }
                _ => break,
            }
        }
        items
    }

    fn primary(&mut self) -> Vec<LookupItem> {
        let Some(tk) = self.peek() else {
            return Vec::new();
        };
        let text = tk.text(self.src);
        match tk.kind {
            TokenKind::NumericLiteral => {
                self.pos += 1;
                let is_float = !text.starts_with("0x")
                    && !text.starts_with("0X")
                    && (text.contains('.') || text.contains(['e', 'E']));
                self.builtin(if is_float { "double" } else { "int" })
            }
            TokenKind::CharLiteral => {
                self.pos += 1;
                self.builtin("char")
            }
            TokenKind::StringLiteral => {
                self.pos += 1;
                let mut ty = FullySpecifiedType::builtin("char");
                ty.is_const = true;
                vec![self.typed(ty.pointer_to())]
            }
            TokenKind::LParen => {
                self.pos += 1;
                let inner = self.expression();
                self.eat(TokenKind::RParen);
                inner
            }
            TokenKind::Keyword if text == "this" => {
                self.pos += 1;
                self.ctx.this_item(self.scope).into_iter().collect()
            }
            TokenKind::Keyword if matches!(text, "true" | "false") => {
                self.pos += 1;
                self.builtin("bool")
            }
            TokenKind::Keyword if text == "nullptr" => {
                self.pos += 1;
                Vec::new()
            }
            TokenKind::Keyword | TokenKind::Identifier if CAST_KEYWORDS.contains(&text) => {
                self.pos += 1;
                self.cast()
            }
            TokenKind::Keyword if is_builtin_type_word(text) => {
                // Functional cast: `int(x)`.
                let start = self.pos;
                while self.at(TokenKind::Keyword) && is_builtin_type_word(self.peek_text()) {
                    self.pos += 1;
                }
                let words = &self.src[self.tokens[start].begin..self.tokens[self.pos - 1].end];
                if self.at(TokenKind::LParen) {
                    self.skip_balanced();
                }
                self.builtin(words)
            }
            TokenKind::Identifier | TokenKind::ColonColon => self.name(),
            TokenKind::Keyword if text == "operator" => {
                self.pos += 1;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// `static_cast<T>(e)` and friends.
    fn cast(&mut self) -> Vec<LookupItem> {
        if !self.at(TokenKind::Less) {
            return Vec::new();
        }
        let open = self.pos;
        self.skip_balanced();
        let close = self.pos;
        if close < open + 2 {
            return Vec::new();
        }
        let first = self.tokens[open + 1];
        let last = self.tokens[close - 2];
        let ty = if first.begin <= last.begin {
            FullySpecifiedType::parse(&self.src[first.begin..last.end])
        } else {
            FullySpecifiedType::unknown()
        };
        if self.at(TokenKind::LParen) {
            self.skip_balanced();
        }
        vec![self.typed(ty)]
    }

    /// Whether the `<` at the cursor opens template arguments (rather than
    /// being a comparison): the matching `>` must exist before any token
    /// that cannot appear in a type.
    fn template_args_follow(&self) -> bool {
        let mut depth = 0usize;
        for tk in &self.tokens[self.pos..] {
            match tk.kind {
                TokenKind::Less => depth += 1,
                TokenKind::Greater => {
                    depth -= 1;
                    if depth == 0 {
                        return true;
                    }
                }
                TokenKind::Operator if tk.text(self.src) == ">>" => return depth <= 2,
                TokenKind::Semicolon | TokenKind::LBrace | TokenKind::RBrace => return false,
                TokenKind::Operator if matches!(tk.text(self.src), "&&" | "||") => return false,
                _ => {}
            }
        }
        false
    }

    /// A possibly qualified name, optionally a template-id.
    fn name(&mut self) -> Vec<LookupItem> {
        let start = self.pos;
        let mut name = QualifiedName::default();
        if self.eat(TokenKind::ColonColon) {
            name.global = true;
        }
        let mut template_text: Option<(usize, usize)> = None;
        loop {
            let Some(tk) = self.peek().filter(|t| t.kind == TokenKind::Identifier) else {
                break;
            };
            self.pos += 1;
            name.segments.push(Ustr::from(tk.text(self.src)));
            template_text = None;
            if self.at(TokenKind::Less) && self.template_args_follow() {
                self.skip_balanced();
                template_text = Some((self.tokens[start].begin, self.tokens[self.pos - 1].end));
            }
            if self.at(TokenKind::ColonColon)
                && self
                    .tokens
                    .get(self.pos + 1)
                    .is_some_and(|t| t.kind == TokenKind::Identifier)
            {
                self.pos += 1;
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Vec::new();
        }

        let items = self.ctx.lookup_qualified(&name, self.scope);
        // `Box<int>` used as a value: keep the template arguments.
        if let Some((begin, end)) = template_text
            && items.iter().any(|i| {
                i.declaration
                    .is_some_and(|d| self.ctx.symbol(d).as_class().is_some())
            })
        {
            let ty = FullySpecifiedType::parse(&self.src[begin..end]);
            return vec![self.typed(ty)];
        }
        items
    }

    // ─── Operations on items ────────────────────────────────────────────

    fn member(&self, items: &[LookupItem], access: AccessOp, name: &str) -> Vec<LookupItem> {
        let mut replaced = false;
        let Some(binding) = self.ctx.base_binding(items, access, Some(&mut replaced)) else {
            return Vec::new();
        };
        self.ctx.find_members(&binding, name)
    }

    fn call(&self, items: &[LookupItem]) -> Vec<LookupItem> {
        let mut out = Vec::new();
        for item in items {
            if let Ty::Symbol(r) = &item.ty.ty {
                let sym = self.ctx.symbol(*r);
                match &sym.kind {
                    SymbolKind::Function(f) => {
                        if let Some(ret) = &f.return_type {
                            out.push(LookupItem {
                                ty: ret.clone(),
                                scope: self.ctx.scope_of(*r),
                                declaration: Some(*r),
                                binding: item.binding.clone(),
                            });
                        }
                        continue;
                    }
                    SymbolKind::Class(_) | SymbolKind::Typedef { .. } => {
                        // A temporary of the named type.
                        out.push(LookupItem {
                            declaration: None,
                            ..item.clone()
                        });
                        continue;
                    }
                    _ => {}
                }
            }
            if let Ty::Named(_) = &item.ty.ty
                && item.declaration.is_none()
            {
                // `Box<int>(...)`.
                out.push(item.clone());
                continue;
            }
            out.extend(self.operator_result(item, "operator()"));
        }
        out
    }

    fn subscript(&self, items: &[LookupItem]) -> Vec<LookupItem> {
        let mut out = Vec::new();
        for item in items {
            let (ty, scope) = self
                .ctx
                .resolve_typedefs(&item.ty, item.scope, item.binding.as_ref());
            match ty.ty {
                Ty::Pointer(inner) | Ty::Array(inner) => out.push(LookupItem {
                    ty: *inner,
                    scope,
                    declaration: None,
                    binding: item.binding.clone(),
                }),
                _ => out.extend(self.operator_result(item, "operator[]")),
            }
        }
        out
    }

    fn dereference(&self, items: &[LookupItem]) -> Vec<LookupItem> {
        let mut out = Vec::new();
        for item in items {
            let (ty, scope) = self
                .ctx
                .resolve_typedefs(&item.ty, item.scope, item.binding.as_ref());
            match ty.ty {
                Ty::Pointer(inner) | Ty::Array(inner) => out.push(LookupItem {
                    ty: *inner,
                    scope,
                    declaration: None,
                    binding: item.binding.clone(),
                }),
                _ => out.extend(self.operator_result(item, "operator*")),
            }
        }
        out
    }

    /// Return types of an overloaded operator on the class of `item`.
    fn operator_result(&self, item: &LookupItem, operator: &str) -> Vec<LookupItem> {
        let Some(class) =
            self.ctx
                .class_binding(&item.ty, item.scope, item.binding.as_ref())
        else {
            return Vec::new();
        };
        if class.kind != BindingKind::Class {
            return Vec::new();
        }
        self.ctx
            .find_members(&class, operator)
            .into_iter()
            .filter_map(|op| {
                let decl = op.declaration?;
                let ret = self.ctx.symbol(decl).as_function()?.return_type.clone()?;
                Some(LookupItem {
                    ty: ret,
                    scope: op.scope,
                    declaration: Some(decl),
                    binding: op.binding,
                })
            })
            .collect()
    }
}

fn is_assignment_op(text: &str) -> bool {
    matches!(
        text,
        "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>="
    )
}

fn is_builtin_type_word(word: &str) -> bool {
    matches!(
        word,
        "bool"
            | "char"
            | "char16_t"
            | "char32_t"
            | "char8_t"
            | "double"
            | "float"
            | "int"
            | "long"
            | "short"
            | "signed"
            | "unsigned"
            | "void"
            | "wchar_t"
    )
}

fn named_type(name: &str) -> FullySpecifiedType {
    FullySpecifiedType::parse(name)
}
