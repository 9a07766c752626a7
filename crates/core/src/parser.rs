use tracing::trace;

use crate::{
    ParseError, SourceLocation,
    ast::{
        ColumnConstraint, ColumnConstraintKind, ColumnDef, ConflictClause, CreateTable,
        ForeignKeyClause, GeneratedStorage, SortOrder, Statement, TableConstraint, TableOption,
        TypeName, UnknownStatement,
    },
    token::{Token, TokenKind, tokenize, unquote},
};

type ParseResult<T> = std::result::Result<T, ParseError>;

/// Words that start a table-level constraint. A column definition never
/// starts with one of them.
const TABLE_CONSTRAINT_KEYWORDS: &[&str] = &["CONSTRAINT", "PRIMARY", "UNIQUE", "CHECK", "FOREIGN"];

/// Words that end a multi-word type name because a column constraint follows.
const COLUMN_CONSTRAINT_KEYWORDS: &[&str] = &[
    "CONSTRAINT",
    "PRIMARY",
    "NOT",
    "NULL",
    "UNIQUE",
    "CHECK",
    "DEFAULT",
    "COLLATE",
    "REFERENCES",
    "GENERATED",
    "AS",
];

/// Tokenizes and parses `text`.
///
/// The returned token buffer is the complete, lossless tokenization; every
/// statement records the range of that buffer it was parsed from.
pub fn parse(text: &str) -> ParseResult<(Vec<Token>, Vec<Statement>)> {
    let tokens = tokenize(text);
    let statements = parse_tokens(&tokens)?;
    Ok((tokens, statements))
}

/// Parses an already tokenized buffer.
pub fn parse_tokens(tokens: &[Token]) -> ParseResult<Vec<Statement>> {
    Parser::new(tokens).parse_statements()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Index just past the last significant token consumed.
    last_end: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            last_end: 0,
        }
    }

    fn parse_statements(mut self) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            self.skip_trivia();
            if self.at_end() {
                break;
            }

            let statement = match self.parse_create_table()? {
                Some(table) => Statement::CreateTable(table),
                None => Statement::Unknown(self.parse_unknown_statement()),
            };
            trace!(
                start = statement.range().start,
                end = statement.range().end,
                create_table = matches!(statement, Statement::CreateTable(_)),
                "parsed statement"
            );
            statements.push(statement);
        }
        Ok(statements)
    }

    // --- cursor primitives ---

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        if let Some(token) = self.current() {
            if token.is_significant() {
                self.last_end = self.pos + 1;
            }
            self.pos += 1;
        }
    }

    /// Moves the cursor back to `pos`, forgetting anything consumed since.
    fn restore(&mut self, pos: usize, last_end: usize) {
        self.pos = pos;
        self.last_end = last_end;
    }

    fn skip_trivia(&mut self) {
        while self.current().is_some_and(|token| token.kind.is_trivia()) {
            self.pos += 1;
        }
    }

    /// Consumes the next significant token when it is `keyword`.
    fn skip_keyword(&mut self, keyword: &str) -> bool {
        self.skip_trivia();
        if self.current().is_some_and(|token| token.is_keyword(keyword)) {
            self.advance();
            return true;
        }
        false
    }

    fn skip_punct(&mut self, punct: &str) -> bool {
        self.skip_trivia();
        if self.current().is_some_and(|token| token.is_punct(punct)) {
            self.advance();
            return true;
        }
        false
    }

    fn skip_any_keyword(&mut self, keywords: &[&'static str]) -> Option<&'static str> {
        keywords
            .iter()
            .copied()
            .find(|keyword| self.skip_keyword(keyword))
    }

    fn expect_keyword(&mut self, keyword: &str, message: &str) -> ParseResult<()> {
        if self.skip_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn expect_punct(&mut self, punct: &str, message: &str) -> ParseResult<()> {
        if self.skip_punct(punct) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn at_bare_word_in(&mut self, keywords: &[&str]) -> bool {
        self.skip_trivia();
        self.current().is_some_and(|token| {
            keywords.iter().any(|keyword| token.is_keyword(keyword))
        })
    }

    // --- names ---

    /// name := bareword | quoted-string
    fn parse_name(&mut self) -> Option<String> {
        self.skip_trivia();
        let token = self.current()?;
        let name = match token.kind {
            TokenKind::Word => token.text.clone(),
            TokenKind::String => unquote(&token.text)?,
            _ => return None,
        };
        self.advance();
        Some(name)
    }

    fn expect_name(&mut self, message: &str) -> ParseResult<String> {
        self.parse_name().ok_or_else(|| self.error(message))
    }

    /// table-name := name ('.' name)?
    fn parse_table_name(&mut self) -> ParseResult<String> {
        let mut name = self.expect_name("Expected a table name")?;
        if self.skip_punct(".") {
            let table = self.expect_name("Expected a table name")?;
            name.push('.');
            name.push_str(&table);
        }
        Ok(name)
    }

    // --- statements ---

    /// Parses `CREATE TABLE`, following <https://www.sqlite.org/lang_createtable.html>.
    ///
    /// `CREATE TEMP TABLE` is left to the unknown-statement rule: a temporary
    /// table is never part of a persistent schema.
    fn parse_create_table(&mut self) -> ParseResult<Option<CreateTable>> {
        let (entry, entry_end) = (self.pos, self.last_end);
        self.skip_trivia();
        let start = self.pos;
        if !(self.skip_keyword("CREATE") && self.skip_keyword("TABLE")) {
            self.restore(entry, entry_end);
            return Ok(None);
        }

        let if_not_exists = if self.skip_keyword("IF") {
            self.expect_keyword("NOT", "Expected NOT EXISTS")?;
            self.expect_keyword("EXISTS", "Expected NOT EXISTS")?;
            true
        } else {
            false
        };

        let name = self.parse_table_name()?;
        self.expect_punct("(", "Expected opening parenthesis")?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        loop {
            if let Some(column) = self.parse_column_def()? {
                columns.push(column);
                if self.skip_punct(",") {
                    continue;
                }
            } else if let Some(constraint) = self.parse_table_constraint() {
                constraints.push(constraint);
                if self.skip_punct(",") {
                    continue;
                }
            }
            if self.skip_punct(")") {
                break;
            }
            return Err(self.error("Expected column definition or constraint"));
        }

        let mut options = Vec::new();
        loop {
            self.skip_trivia();
            if self.at_end() || self.current().is_some_and(|token| token.is_punct(";")) {
                break;
            }
            let option = self
                .parse_table_option()?
                .ok_or_else(|| self.error("Unknown table option"))?;
            options.push(option);
            self.skip_punct(",");
        }
        self.skip_punct(";");

        Ok(Some(CreateTable {
            name,
            if_not_exists,
            columns,
            constraints,
            options,
            range: start..self.last_end,
        }))
    }

    /// Collects significant token texts up to and including the terminating
    /// `;`. Inside a trigger, `;` within `BEGIN ... END` does not terminate.
    fn parse_unknown_statement(&mut self) -> UnknownStatement {
        self.skip_trivia();
        let start = self.pos;
        let mut fragments: Vec<String> = Vec::new();
        let mut in_trigger = false;
        let mut block_depth = 0usize;

        while let Some(token) = self.current() {
            if token.is_significant() {
                let terminates = token.is_punct(";") && block_depth == 0;

                if token.is_keyword("TRIGGER")
                    && fragments.len() <= 2
                    && fragments
                        .first()
                        .is_some_and(|first| first.eq_ignore_ascii_case("CREATE"))
                {
                    in_trigger = true;
                } else if in_trigger {
                    if token.is_keyword("BEGIN") || (block_depth > 0 && token.is_keyword("CASE")) {
                        block_depth += 1;
                    } else if block_depth > 0 && token.is_keyword("END") {
                        block_depth -= 1;
                    }
                }

                fragments.push(token.text.clone());
                self.advance();
                if terminates {
                    break;
                }
            } else {
                self.advance();
            }
        }

        UnknownStatement {
            tokens: fragments,
            range: start..self.last_end.max(start),
        }
    }

    // --- table body ---

    /// column-def := name type-name? column-constraint*
    fn parse_column_def(&mut self) -> ParseResult<Option<ColumnDef>> {
        if self.at_bare_word_in(TABLE_CONSTRAINT_KEYWORDS) {
            return Ok(None);
        }
        let start = self.pos;
        let Some(name) = self.parse_name() else {
            return Ok(None);
        };

        let type_name = self.parse_type_name()?;
        let mut constraints = Vec::new();
        while let Some(constraint) = self.parse_column_constraint()? {
            constraints.push(constraint);
        }

        Ok(Some(ColumnDef {
            name,
            type_name,
            constraints,
            range: start..self.last_end,
        }))
    }

    /// Table-level constraints are not supported yet; this never matches.
    fn parse_table_constraint(&mut self) -> Option<TableConstraint> {
        None
    }

    /// type-name := bareword+ ('(' expr (',' expr)? ')')?
    fn parse_type_name(&mut self) -> ParseResult<Option<TypeName>> {
        self.skip_trivia();
        let start = self.pos;
        let mut words = Vec::new();
        while !self.at_bare_word_in(COLUMN_CONSTRAINT_KEYWORDS)
            && let Some(token) = self.current()
            && token.kind == TokenKind::Word
        {
            words.push(token.text.to_ascii_uppercase());
            self.advance();
        }
        if words.is_empty() {
            return Ok(None);
        }

        let mut arg1 = None;
        let mut arg2 = None;
        if self.skip_punct("(") {
            arg1 = self.parse_expr()?;
            if self.skip_punct(",") {
                arg2 = self.parse_expr()?;
            }
            self.expect_punct(")", "Expected closing parenthesis")?;
        }

        Ok(Some(TypeName {
            name: words.join(" "),
            arg1,
            arg2,
            range: start..self.last_end,
        }))
    }

    /// Raw expression text, balanced on parentheses and stopped at a top-level
    /// `,` or `)`, or at any `;`.
    fn parse_expr(&mut self) -> ParseResult<Option<String>> {
        let mut text = String::new();
        let mut depth = 0usize;
        while let Some(token) = self.current() {
            if token.is_punct(";") || (depth == 0 && (token.is_punct(")") || token.is_punct(",")))
            {
                break;
            }
            if token.is_punct("(") {
                depth += 1;
            } else if token.is_punct(")") {
                depth -= 1;
            }
            text.push_str(&token.text);
            self.advance();
        }
        if depth > 0 {
            return Err(self.error("Unbalanced parenthesis"));
        }

        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    fn expect_parenthesized_expr(&mut self) -> ParseResult<String> {
        self.expect_punct("(", "Expected opening parenthesis")?;
        let expr = self
            .parse_expr()?
            .ok_or_else(|| self.error("Expected expression"))?;
        self.expect_punct(")", "Expected closing parenthesis")?;
        Ok(expr)
    }

    /// column-constraint := (CONSTRAINT name)? constraint-body
    fn parse_column_constraint(&mut self) -> ParseResult<Option<ColumnConstraint>> {
        let (entry, entry_end) = (self.pos, self.last_end);
        self.skip_trivia();
        let start = self.pos;

        let name = if self.skip_keyword("CONSTRAINT") {
            Some(self.expect_name("Expected constraint name")?)
        } else {
            None
        };

        let Some(kind) = self.parse_column_constraint_kind()? else {
            if name.is_some() {
                return Err(self.error("Expected column constraint"));
            }
            self.restore(entry, entry_end);
            return Ok(None);
        };

        Ok(Some(ColumnConstraint {
            name,
            kind,
            range: start..self.last_end,
        }))
    }

    fn parse_column_constraint_kind(&mut self) -> ParseResult<Option<ColumnConstraintKind>> {
        if self.skip_keyword("PRIMARY") {
            self.expect_keyword("KEY", "Expected KEY")?;
            let order = match self.skip_any_keyword(&["ASC", "DESC"]) {
                Some("ASC") => Some(SortOrder::Asc),
                Some(_) => Some(SortOrder::Desc),
                None => None,
            };
            let conflict = self.parse_conflict_clause()?;
            let autoincrement = self.skip_keyword("AUTOINCREMENT");
            return Ok(Some(ColumnConstraintKind::PrimaryKey {
                order,
                conflict,
                autoincrement,
            }));
        }
        if self.skip_keyword("NOT") {
            self.expect_keyword("NULL", "Expected NULL")?;
            let conflict = self.parse_conflict_clause()?;
            return Ok(Some(ColumnConstraintKind::NotNull { conflict }));
        }
        if self.skip_keyword("NULL") {
            let conflict = self.parse_conflict_clause()?;
            return Ok(Some(ColumnConstraintKind::Null { conflict }));
        }
        if self.skip_keyword("UNIQUE") {
            let conflict = self.parse_conflict_clause()?;
            return Ok(Some(ColumnConstraintKind::Unique { conflict }));
        }
        if self.skip_keyword("CHECK") {
            let expr = self.expect_parenthesized_expr()?;
            return Ok(Some(ColumnConstraintKind::Check { expr }));
        }
        if self.skip_keyword("DEFAULT") {
            let value = self.parse_default_value()?;
            return Ok(Some(ColumnConstraintKind::Default { value }));
        }
        if self.skip_keyword("COLLATE") {
            let collation = self.expect_name("Expected collation name")?;
            return Ok(Some(ColumnConstraintKind::Collate { collation }));
        }
        if self.skip_keyword("REFERENCES") {
            let clause = self.parse_foreign_key_clause()?;
            return Ok(Some(ColumnConstraintKind::References(clause)));
        }
        let generated = self.skip_keyword("GENERATED");
        if generated {
            self.expect_keyword("ALWAYS", "Expected ALWAYS")?;
            self.expect_keyword("AS", "Expected AS")?;
        }
        if generated || self.skip_keyword("AS") {
            let expr = self.expect_parenthesized_expr()?;
            let storage = match self.skip_any_keyword(&["STORED", "VIRTUAL"]) {
                Some("STORED") => Some(GeneratedStorage::Stored),
                Some(_) => Some(GeneratedStorage::Virtual),
                None => None,
            };
            return Ok(Some(ColumnConstraintKind::Generated { expr, storage }));
        }
        Ok(None)
    }

    /// conflict-clause := ON CONFLICT (ROLLBACK|ABORT|FAIL|IGNORE|REPLACE)
    fn parse_conflict_clause(&mut self) -> ParseResult<Option<ConflictClause>> {
        let (entry, entry_end) = (self.pos, self.last_end);
        if !(self.skip_keyword("ON") && self.skip_keyword("CONFLICT")) {
            self.restore(entry, entry_end);
            return Ok(None);
        }
        ConflictClause::ALL
            .into_iter()
            .find(|clause| self.skip_keyword(clause.keyword()))
            .map(Some)
            .ok_or_else(|| self.error("Expected conflict resolution"))
    }

    /// DEFAULT ('(' expr ')' | signed-number | literal)
    fn parse_default_value(&mut self) -> ParseResult<String> {
        self.skip_trivia();
        if self.current().is_some_and(|token| token.is_punct("(")) {
            let expr = self.expect_parenthesized_expr()?;
            return Ok(format!("({expr})"));
        }

        let mut value = String::new();
        if let Some(token) = self.current()
            && token.kind == TokenKind::Other
            && (token.text == "-" || token.text == "+")
        {
            value.push_str(&token.text);
            self.advance();
            self.skip_trivia();
        }

        match self.current() {
            Some(token) if matches!(token.kind, TokenKind::Word | TokenKind::String) => {
                value.push_str(&token.text);
                self.advance();
            }
            Some(token) if token.is_punct(".") => {}
            _ => return Err(self.error("Expected default value")),
        }

        // Blob literal: `X'00'` is a word directly followed by a string.
        if value.eq_ignore_ascii_case("x")
            && let Some(blob) = self.current()
            && blob.kind == TokenKind::String
        {
            value.push_str(&blob.text);
            self.advance();
            return Ok(value);
        }

        // Decimal part of a numeric literal: `1.5`, `.5`.
        if let Some(dot) = self.current()
            && dot.is_punct(".")
            && let Some(fraction) = self.tokens.get(self.pos + 1)
            && fraction.kind == TokenKind::Word
        {
            value.push('.');
            value.push_str(&fraction.text);
            self.advance();
            self.advance();
        }

        // Signed exponent: `1e-5` tokenizes as `1e`, `-`, `5`.
        if value.ends_with(['e', 'E'])
            && value
                .trim_start_matches(['-', '+'])
                .starts_with(|ch: char| ch.is_ascii_digit() || ch == '.')
            && let Some(sign) = self.current()
            && sign.kind == TokenKind::Other
            && (sign.text == "-" || sign.text == "+")
            && let Some(exponent) = self.tokens.get(self.pos + 1)
            && exponent.kind == TokenKind::Word
            && exponent.text.chars().all(|ch| ch.is_ascii_digit())
        {
            value.push_str(&sign.text);
            value.push_str(&exponent.text);
            self.advance();
            self.advance();
        }

        if value.is_empty() || value == "-" || value == "+" {
            return Err(self.error("Expected default value"));
        }
        Ok(value)
    }

    /// foreign-key-clause := REFERENCES name ('(' name (',' name)* ')')? action*
    fn parse_foreign_key_clause(&mut self) -> ParseResult<ForeignKeyClause> {
        let table = self.expect_name("Expected a table name")?;
        let mut columns = Vec::new();
        if self.skip_punct("(") {
            loop {
                columns.push(self.expect_name("Expected a column name")?);
                if self.skip_punct(",") {
                    continue;
                }
                self.expect_punct(")", "Expected closing parenthesis")?;
                break;
            }
        }

        let mut actions = Vec::new();
        loop {
            let (entry, entry_end) = (self.pos, self.last_end);
            if self.skip_keyword("ON") {
                let Some(event) = self.skip_any_keyword(&["DELETE", "UPDATE"]) else {
                    self.restore(entry, entry_end);
                    break;
                };
                let action = if self.skip_keyword("SET") {
                    match self.skip_any_keyword(&["NULL", "DEFAULT"]) {
                        Some(value) => format!("SET {value}"),
                        None => return Err(self.error("Expected NULL or DEFAULT")),
                    }
                } else if self.skip_keyword("NO") {
                    self.expect_keyword("ACTION", "Expected ACTION")?;
                    "NO ACTION".to_string()
                } else if let Some(action) = self.skip_any_keyword(&["CASCADE", "RESTRICT"]) {
                    action.to_string()
                } else {
                    return Err(self.error("Expected foreign key action"));
                };
                actions.push(format!("ON {event} {action}"));
            } else if self.skip_keyword("MATCH") {
                let name = self.expect_name("Expected match name")?;
                actions.push(format!("MATCH {}", name.to_ascii_uppercase()));
            } else {
                let negated = self.skip_keyword("NOT");
                if !self.skip_keyword("DEFERRABLE") {
                    self.restore(entry, entry_end);
                    break;
                }
                let mut action = if negated {
                    "NOT DEFERRABLE".to_string()
                } else {
                    "DEFERRABLE".to_string()
                };
                if self.skip_keyword("INITIALLY") {
                    let mode = self
                        .skip_any_keyword(&["DEFERRED", "IMMEDIATE"])
                        .ok_or_else(|| self.error("Expected DEFERRED or IMMEDIATE"))?;
                    action.push_str(" INITIALLY ");
                    action.push_str(mode);
                }
                actions.push(action);
            }
        }

        Ok(ForeignKeyClause {
            table,
            columns,
            actions,
        })
    }

    /// table-option := WITHOUT ROWID | STRICT
    fn parse_table_option(&mut self) -> ParseResult<Option<TableOption>> {
        self.skip_trivia();
        let start = self.pos;
        let text = if self.skip_keyword("WITHOUT") {
            self.expect_keyword("ROWID", "Expected ROWID")?;
            "WITHOUT ROWID"
        } else if self.skip_keyword("STRICT") {
            "STRICT"
        } else {
            return Ok(None);
        };
        Ok(Some(TableOption {
            text: text.to_string(),
            range: start..self.last_end,
        }))
    }

    // --- errors ---

    fn error(&self, message: &str) -> ParseError {
        let (location, line_text) = locate(self.tokens, self.pos);
        ParseError::Syntax {
            message: message.to_string(),
            location,
            line_text,
        }
    }
}

/// Computes the 1-based line and column of token `pos` and the full text of
/// its line. Only called on the error path.
fn locate(tokens: &[Token], pos: usize) -> (SourceLocation, String) {
    let pos = pos.min(tokens.len());
    let mut line = 1;
    let mut column = 1;
    let mut line_text = String::new();

    for token in &tokens[..pos] {
        let mut chars = token.text.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\n' | '\r' => {
                    if ch == '\r' && chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    line += 1;
                    column = 1;
                    line_text.clear();
                }
                _ => {
                    column += 1;
                    line_text.push(ch);
                }
            }
        }
    }

    for token in &tokens[pos..] {
        if let Some(end) = token.text.find(['\n', '\r']) {
            line_text.push_str(&token.text[..end]);
            break;
        }
        line_text.push_str(&token.text);
    }

    (SourceLocation { line, column }, line_text)
}
