// choice.rs
//
// Las opciones de dominio se expresan como enums con un código estable y una
// etiqueta visible. El historial y la interfaz usan siempre `display()`.

/// Opción enumerada con código estable y etiqueta en español.
pub trait Choice: Copy + Sized + 'static {
  /// Todas las variantes en orden de declaración.
  const ALL: &'static [Self];

  /// Código estable (snake_case) usado en persistencia y payloads.
  fn code(&self) -> &'static str;

  /// Etiqueta visible.
  fn display(&self) -> &'static str;

  /// Busca una variante por código o por etiqueta, sin distinguir mayúsculas
  /// ni tildes.
  fn parse_choice(s: &str) -> Option<Self> {
    let wanted = normalize(s);
    Self::ALL.iter()
             .copied()
             .find(|c| normalize(c.code()) == wanted || normalize(c.display()) == wanted)
  }
}

/// Minúsculas, sin tildes y con espacios/guiones unificados a `_`.
pub fn normalize(s: &str) -> String {
  s.trim()
   .to_lowercase()
   .chars()
   .map(|c| match c {
     'á' | 'à' | 'ä' => 'a',
     'é' | 'è' | 'ë' => 'e',
     'í' | 'ì' | 'ï' => 'i',
     'ó' | 'ò' | 'ö' => 'o',
     'ú' | 'ù' | 'ü' => 'u',
     ' ' | '-' => '_',
     other => other,
   })
   .collect()
}

#[cfg(test)]
mod tests {
  use super::normalize;

  #[test]
  fn normalize_strips_accents_and_spaces() {
    assert_eq!(normalize(" Observación en Proyecto-de convenio "), "observacion_en_proyecto_de_convenio");
  }
}
