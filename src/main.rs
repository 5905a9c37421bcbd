use admisiones_domain::{Actor, AdmissionFilter, AdmissionType, Choice, DocumentStatus, Role};
use admisiones_workflow::{ActionContext, AdmissionWorkflow, AdmissionWorkflowFactory, TransitionOutcome, Upload,
                          WorkflowError};
use std::io::{self, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Menú interactivo sobre el motor de admisiones armado en memoria.
///
/// Opciones soportadas:
/// 1) Ver admisiones
/// 2) Crear admisión
/// 3) Cargar documento
/// 4) Cambiar estado de documento
/// 5) Ejecutar acción (clave POST + payload JSON)
/// 6) Ver historial
/// 7) Ver acciones disponibles
/// 8) Cambiar de actor
/// 9) Salir
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("admisiones_workflow=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let wf = AdmissionWorkflowFactory::in_memory()?;
    log::info!("Motor de admisiones armado en memoria (timeout de artefactos {:?})",
               wf.machine.config().artifact_timeout);
    println!("Comedor de prueba: {}", wf.sample.kitchen_id);
    println!("Convenios: eclesiástico {} | personería {} | base {}",
             wf.sample.eclesiastica_id, wf.sample.personeria_id, wf.sample.base_id);

    let mut actor = choose_actor()?;

    loop {
        println!("\n== Admisiones ({}) ==", actor);
        println!("1) Ver admisiones");
        println!("2) Crear admisión");
        println!("3) Cargar documento");
        println!("4) Cambiar estado de documento");
        println!("5) Ejecutar acción (clave POST)");
        println!("6) Ver historial");
        println!("7) Ver acciones disponibles");
        println!("8) Cambiar de actor");
        println!("9) Salir");
        let choice = prompt("Elige una opción: ")?;
        let result = match choice.trim() {
            "1" => list(&wf),
            "2" => create(&wf, &actor),
            "3" => upload(&wf, &actor),
            "4" => set_status(&wf, &actor),
            "5" => dispatch(&wf, &actor),
            "6" => history(&wf),
            "7" => actions(&wf, &actor),
            "8" => {
                actor = choose_actor()?;
                Ok(())
            }
            "9" => break,
            _ => {
                println!("Opción inválida");
                Ok(())
            }
        };
        if let Err(e) = result {
            eprintln!("Error ({}): {}", e.message_family(), e);
        }
    }
    Ok(())
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

fn prompt_uuid(msg: &str) -> Result<Uuid, WorkflowError> {
    let s = prompt(msg).map_err(|e| WorkflowError::ValidationFailure(e.to_string()))?;
    Uuid::parse_str(&s).map_err(|_| WorkflowError::ValidationFailure(format!("UUID inválido: '{}'", s)))
}

fn choose_actor() -> io::Result<Actor> {
    println!("Grupos: {}", Role::ALL.iter().map(|r| r.code()).collect::<Vec<_>>().join(", "));
    loop {
        let raw = prompt("Grupos del actor (separados por coma): ")?;
        let roles: Option<Vec<Role>> = raw.split(',').map(Role::parse_choice).collect();
        match roles {
            Some(roles) if !roles.is_empty() => {
                let id = prompt("Identificador del actor: ")?;
                let id = if id.is_empty() { "cli".to_string() } else { id };
                return Ok(Actor::new(id, roles));
            }
            _ => eprintln!("Grupo desconocido"),
        }
    }
}

fn show(outcome: &TransitionOutcome) {
    let a = &outcome.admission;
    println!("Admisión {} v{}: {} / {}",
             a.id,
             outcome.version,
             a.admission_state.display(),
             a.legal_state.map(|l| l.display()).unwrap_or("-"));
    for w in &outcome.warnings {
        println!("  advertencia: {}", w);
    }
    if outcome.replayed {
        println!("  (comando ya aplicado)");
    }
}

fn list(wf: &AdmissionWorkflow) -> Result<(), WorkflowError> {
    let admissions = wf.machine.list(&AdmissionFilter::default())?;
    println!("\nID                                   | TIPO          | ESTADO                         | LEGALES");
    println!("------------------------------------------------------------------------------------------------");
    for a in admissions {
        println!("{} | {:13} | {:30} | {}",
                 a.id,
                 a.admission_type.display(),
                 a.admission_state.display(),
                 a.legal_state.map(|l| l.display()).unwrap_or("-"));
    }
    Ok(())
}

fn create(wf: &AdmissionWorkflow, actor: &Actor) -> Result<(), WorkflowError> {
    let convenio = prompt_uuid("Convenio (UUID): ")?;
    let raw = prompt("Tipo (incorporacion/renovacion): ").map_err(|e| WorkflowError::ValidationFailure(e.to_string()))?;
    let admission_type = match raw.as_str() {
        "renovacion" | "renewal" => AdmissionType::Renewal,
        _ => AdmissionType::Incorporation,
    };
    let out = wf.machine.create_admission(wf.sample.kitchen_id, convenio, admission_type, actor, None)?;
    show(&out);
    Ok(())
}

fn upload(wf: &AdmissionWorkflow, actor: &Actor) -> Result<(), WorkflowError> {
    let id = prompt_uuid("Admisión (UUID): ")?;
    for slot in wf.machine.documents(&id)? {
        if let Some(entry) = slot.catalog {
            let status = slot.document.map(|d| d.status().display()).unwrap_or("sin cargar");
            println!("  {} | {}{} | {}", entry.id, entry.name, if entry.mandatory { " *" } else { "" }, status);
        }
    }
    let catalog_id = prompt_uuid("Documento de catálogo (UUID): ")?;
    let name = prompt("Nombre del archivo: ").map_err(|e| WorkflowError::ValidationFailure(e.to_string()))?;
    let out = wf.machine.upload_document(&ActionContext::new(id, actor.clone()), catalog_id, Upload::new(&name, name.as_bytes()))?;
    show(&out);
    Ok(())
}

fn set_status(wf: &AdmissionWorkflow, actor: &Actor) -> Result<(), WorkflowError> {
    let id = prompt_uuid("Admisión (UUID): ")?;
    let record = wf.machine.get(&id)?;
    for d in &record.documents {
        println!("  {} | {} | {}", d.id, d.name, d.status().display());
    }
    let doc = prompt_uuid("Documento (UUID): ")?;
    let raw = prompt("Estado nuevo: ").map_err(|e| WorkflowError::ValidationFailure(e.to_string()))?;
    let status = DocumentStatus::parse_choice(&raw)
        .ok_or_else(|| WorkflowError::ValidationFailure(format!("Estado desconocido '{}'", raw)))?;
    let obs = prompt("Observaciones (enter para ninguna): ").map_err(|e| WorkflowError::ValidationFailure(e.to_string()))?;
    let obs = if obs.is_empty() { None } else { Some(obs.as_str()) };
    let out = wf.machine.set_document_status(&ActionContext::new(id, actor.clone()), doc, status, obs)?;
    show(&out);
    Ok(())
}

fn dispatch(wf: &AdmissionWorkflow, actor: &Actor) -> Result<(), WorkflowError> {
    let id = prompt_uuid("Admisión (UUID): ")?;
    let key = prompt("Clave de la acción: ").map_err(|e| WorkflowError::ValidationFailure(e.to_string()))?;
    let raw = prompt("Payload JSON (enter para {}): ").map_err(|e| WorkflowError::ValidationFailure(e.to_string()))?;
    let payload = if raw.is_empty() { serde_json::json!({}) } else { serde_json::from_str(&raw)? };
    let out = wf.router.dispatch(&key, &ActionContext::new(id, actor.clone()), payload)?;
    show(&out);
    Ok(())
}

fn history(wf: &AdmissionWorkflow) -> Result<(), WorkflowError> {
    let id = prompt_uuid("Admisión (UUID): ")?;
    for e in wf.machine.history(&id)? {
        let change = serde_json::to_string(&e.change)?;
        println!("{:>4} | {} | {} | {}", e.cursor, e.created_at.format("%Y-%m-%d %H:%M:%S"), e.actor, change);
    }
    Ok(())
}

fn actions(wf: &AdmissionWorkflow, actor: &Actor) -> Result<(), WorkflowError> {
    let id = prompt_uuid("Admisión (UUID): ")?;
    let keys: Vec<&str> = wf.machine.available_actions(&id, actor)?.iter().map(|a| a.key()).collect();
    if keys.is_empty() {
        println!("Sin acciones disponibles");
    } else {
        println!("{}", keys.join(", "));
    }
    Ok(())
}
