// actor.rs
use crate::choice::Choice;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Grupos de usuarios que intervienen en una admisión.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Technician,
  DuplaTechnician,
  DuplaLawyer,
  Coordinator,
  LegalArea,
  Superuser,
}

impl Choice for Role {
  const ALL: &'static [Self] = &[Role::Technician,
                                 Role::DuplaTechnician,
                                 Role::DuplaLawyer,
                                 Role::Coordinator,
                                 Role::LegalArea,
                                 Role::Superuser];

  fn code(&self) -> &'static str {
    match self {
      Role::Technician => "technician",
      Role::DuplaTechnician => "dupla_technician",
      Role::DuplaLawyer => "dupla_lawyer",
      Role::Coordinator => "coordinator",
      Role::LegalArea => "legal_area",
      Role::Superuser => "superuser",
    }
  }

  fn display(&self) -> &'static str {
    match self {
      Role::Technician => "Técnico",
      Role::DuplaTechnician => "Técnico de dupla",
      Role::DuplaLawyer => "Abogado de dupla",
      Role::Coordinator => "Coordinador",
      Role::LegalArea => "Área legales",
      Role::Superuser => "Superusuario",
    }
  }
}

/// Usuario que ejecuta una operación: identificador opaco y grupos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  id: String,
  roles: BTreeSet<Role>,
}

impl Actor {
  pub fn new(id: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
    Self { id: id.into(), roles: roles.into_iter().collect() }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn roles(&self) -> &BTreeSet<Role> {
    &self.roles
  }

  pub fn has_role(&self, role: Role) -> bool {
    self.roles.contains(&role)
  }

  /// Verdadero si el actor tiene alguno de los grupos indicados. El
  /// superusuario los tiene todos.
  pub fn has_any(&self, roles: &[Role]) -> bool {
    self.is_superuser() || roles.iter().any(|r| self.roles.contains(r))
  }

  pub fn is_superuser(&self) -> bool {
    self.roles.contains(&Role::Superuser)
  }

  pub fn is_technician(&self) -> bool {
    self.has_any(&[Role::Technician, Role::DuplaTechnician])
  }

  pub fn is_lawyer(&self) -> bool {
    self.has_any(&[Role::DuplaLawyer, Role::LegalArea])
  }
}

impl fmt::Display for Actor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let roles: Vec<&str> = self.roles.iter().map(|r| r.code()).collect();
    write!(f, "{} [{}]", self.id, roles.join(","))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn superuser_has_every_role() {
    let admin = Actor::new("admin", [Role::Superuser]);
    assert!(admin.is_lawyer());
    assert!(admin.is_technician());
    assert!(admin.has_any(&[Role::Coordinator]));
  }

  #[test]
  fn roles_parse_from_code_or_label() {
    assert_eq!(Role::parse_choice("dupla_lawyer"), Some(Role::DuplaLawyer));
    assert_eq!(Role::parse_choice("Área legales"), Some(Role::LegalArea));
    assert_eq!(Role::parse_choice("nadie"), None);
  }
}
