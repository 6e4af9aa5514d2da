use std::collections::HashMap;
use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Quit,
    CloseFront,
    CloseAll,
    Minimize,
    RestoreLast,
    RaiseNext,
    Fetch,
    Query,
    DebugLog,
    Help,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::Quit,
        Action::CloseFront,
        Action::CloseAll,
        Action::Minimize,
        Action::RestoreLast,
        Action::RaiseNext,
        Action::Fetch,
        Action::Query,
        Action::DebugLog,
        Action::Help,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Quit => "Quit",
            Action::CloseFront => "Close front window",
            Action::CloseAll => "Close all windows",
            Action::Minimize => "Minimize front window",
            Action::RestoreLast => "Restore last minimized",
            Action::RaiseNext => "Raise next window",
            Action::Fetch => "Fetch HUD data",
            Action::Query => "Ask the assistant",
            Action::DebugLog => "Show debug log",
            Action::Help => "Show key bindings",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombo {
    pub code: KeyCode,
    pub mods: KeyModifiers,
}

impl KeyCombo {
    pub fn new(code: KeyCode, mods: KeyModifiers) -> Self {
        Self { code, mods }
    }

    pub fn plain(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    /// Character keys ignore SHIFT: terminals disagree on whether `X` or `?`
    /// arrive with it set.
    pub fn matches(&self, key: &KeyEvent) -> bool {
        if key.code != self.code {
            return false;
        }
        match self.code {
            KeyCode::Char(_) => {
                key.modifiers.difference(KeyModifiers::SHIFT)
                    == self.mods.difference(KeyModifiers::SHIFT)
            }
            _ => key.modifiers == self.mods,
        }
    }

    pub fn display(&self) -> String {
        let mut parts = Vec::new();
        if self.mods.contains(KeyModifiers::CONTROL) {
            parts.push("Ctrl".to_string());
        }
        if self.mods.contains(KeyModifiers::ALT) {
            parts.push("Alt".to_string());
        }
        let code = match self.code {
            KeyCode::Char(c) if self.mods.contains(KeyModifiers::CONTROL) => {
                c.to_ascii_uppercase().to_string()
            }
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Esc => "Esc".to_string(),
            KeyCode::Enter => "Enter".to_string(),
            KeyCode::Tab => "Tab".to_string(),
            KeyCode::BackTab => "Shift+Tab".to_string(),
            KeyCode::F(n) => format!("F{}", n),
            _ => format!("{:?}", self.code),
        };
        parts.push(code);
        parts.join("+")
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[derive(Debug, Clone)]
pub struct KeyBindings {
    map: HashMap<Action, Vec<KeyCombo>>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        use Action::*;
        let mut kb = Self::empty();
        kb.add(
            Quit,
            KeyCombo::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
        );
        kb.add(CloseFront, KeyCombo::plain('x'));
        kb.add(CloseAll, KeyCombo::plain('X'));
        kb.add(Minimize, KeyCombo::plain('m'));
        kb.add(RestoreLast, KeyCombo::plain('r'));
        kb.add(RaiseNext, KeyCombo::new(KeyCode::Tab, KeyModifiers::NONE));
        kb.add(Fetch, KeyCombo::plain('f'));
        kb.add(Query, KeyCombo::plain('/'));
        kb.add(DebugLog, KeyCombo::plain('d'));
        kb.add(Help, KeyCombo::plain('?'));
        kb
    }
}

impl KeyBindings {
    pub fn empty() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn add(&mut self, action: Action, combo: KeyCombo) {
        self.map.entry(action).or_default().push(combo);
    }

    pub fn matches(&self, action: Action, key: &KeyEvent) -> bool {
        self.map
            .get(&action)
            .is_some_and(|list| list.iter().any(|c| c.matches(key)))
    }

    pub fn action_for_key(&self, key: &KeyEvent) -> Option<Action> {
        Action::ALL
            .into_iter()
            .find(|action| self.matches(*action, key))
    }

    /// `(action, combos)` pairs in declaration order, for the help window.
    pub fn help_entries(&self) -> Vec<(Action, Vec<String>)> {
        Action::ALL
            .into_iter()
            .filter_map(|action| {
                let combos = self.combos_for(action);
                (!combos.is_empty()).then_some((action, combos))
            })
            .collect()
    }

    pub fn combos_for(&self, action: Action) -> Vec<String> {
        self.map
            .get(&action)
            .map(|list| list.iter().map(|c| c.display()).collect())
            .unwrap_or_default()
    }
}
