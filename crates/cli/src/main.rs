use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use obc_core::config::{data_dir_from_env_value, pad_width_from_env_value};
use obc_core::constants::PRENATAL_PAD_WIDTH;
use obc_core::derived::{gestational_age_text, BmiClass};
use obc_core::model::{
    CareLevel, Certification, CivilStatus, HealthPlan, MidwifeRole, MidwifeSpecialty,
    NursingTechnicianRole, ObstetricRecord, PatientRole, Person, PersonInput, PhysicianRole,
    PhysicianSpecialty, RecordFields, RiskLevel, RoleData, RoleId, RoleKind, ScreeningResult,
    Sex, Shift,
};
use obc_core::{
    Author, ClinicalStore, Clock, CoreConfig, FileBackend, IdentityRegistry,
    ObstetricRecordService, PathologyInput, PathologyService, PersonService, RoleBinder,
    RoleDirectory, SeriesConfig, SeriesKind, StoreBackend, SystemClock,
};
use obc_types::NonEmptyText;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "obc")]
#[command(about = "Obstetric care record engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Identity number helpers
    #[command(subcommand)]
    Rut(RutCommand),
    /// Register and look up people
    #[command(subcommand)]
    Person(PersonCommand),
    /// Bind and end clinical roles
    #[command(subcommand)]
    Role(RoleCommand),
    /// Maintain the pathology catalog
    #[command(subcommand)]
    Pathology(PathologyCommand),
    /// Create and amend obstetric records
    #[command(subcommand)]
    Record(RecordCommand),
}

#[derive(Subcommand)]
enum RutCommand {
    /// Check an identity number
    Check { rut: String },
    /// Print the canonical form (`12345678-5`)
    Normalize { rut: String },
    /// Print the display form (`12.345.678-5`)
    Format { rut: String },
    /// Compute the check digit of a body
    Dv { body: String },
}

#[derive(Subcommand)]
enum PersonCommand {
    /// Register a new person
    Register(PersonArgs),
    /// Show a person by identity number
    Find { rut: String },
    /// Deactivate a person
    Deactivate { rut: String },
}

#[derive(Args)]
struct PersonArgs {
    /// Identity number, any separator style
    #[arg(long)]
    rut: String,
    #[arg(long)]
    given_name: String,
    #[arg(long)]
    paternal_surname: String,
    #[arg(long, default_value = "")]
    maternal_surname: String,
    /// female, male or intersex
    #[arg(long, value_parser = parse_enum::<Sex>)]
    sex: Sex,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long)]
    birth_date: NaiveDate,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long, default_value = "")]
    email: String,
}

#[derive(Subcommand)]
enum RoleCommand {
    /// Bind the patient role
    BindPatient {
        rut: String,
        #[arg(long, value_parser = parse_enum::<CivilStatus>)]
        civil_status: CivilStatus,
        /// e.g. fonasa_b, isapre
        #[arg(long, value_parser = parse_enum::<HealthPlan>)]
        health_plan: HealthPlan,
        /// Obstetric formula, e.g. G3P2A0
        #[arg(long)]
        parity: Option<String>,
        #[arg(long)]
        bmi: Option<Decimal>,
        #[arg(long)]
        prenatal_control: bool,
        #[arg(long, default_value = "")]
        companion: String,
        #[arg(long, default_value = "")]
        emergency_contact: String,
    },
    /// Bind the physician role
    BindPhysician {
        rut: String,
        #[arg(long, value_parser = parse_enum::<PhysicianSpecialty>)]
        specialty: PhysicianSpecialty,
        #[command(flatten)]
        professional: ProfessionalArgs,
    },
    /// Bind the midwife role
    BindMidwife {
        rut: String,
        #[arg(long, value_parser = parse_enum::<MidwifeSpecialty>)]
        specialty: MidwifeSpecialty,
        #[command(flatten)]
        professional: ProfessionalArgs,
    },
    /// Bind the nursing technician role
    BindTens {
        rut: String,
        #[arg(long, value_parser = parse_enum::<CareLevel>)]
        level: CareLevel,
        #[arg(long)]
        years: u8,
        #[arg(long, value_parser = parse_enum::<Shift>)]
        shift: Shift,
        #[arg(long, value_parser = parse_enum::<Certification>)]
        certification: Certification,
    },
    /// End a role instance
    Unbind { role_id: String },
}

#[derive(Args)]
struct ProfessionalArgs {
    /// Professional registration number
    #[arg(long)]
    registration: String,
    #[arg(long)]
    years: u8,
    #[arg(long, value_parser = parse_enum::<Shift>)]
    shift: Shift,
}

#[derive(Subcommand)]
enum PathologyCommand {
    /// Add a catalog entry
    Add {
        #[arg(long)]
        name: String,
        /// ICD-10 code
        #[arg(long)]
        code: String,
        /// low, medium, high or critical
        #[arg(long, value_parser = parse_enum::<RiskLevel>)]
        risk: RiskLevel,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        follow_up: String,
    },
    /// List active entries
    List,
    /// Deactivate an entry by code
    Deactivate { code: String },
}

#[derive(Subcommand)]
enum RecordCommand {
    /// Create a prenatal record for a patient
    Create {
        /// Patient identity number
        patient: String,
        /// Acting midwife identity number; also set as responsible midwife
        #[arg(long = "as")]
        actor: String,
        #[command(flatten)]
        fields: RecordArgs,
    },
    /// Amend a record; omitted options keep their current value
    Amend {
        code: String,
        /// Acting professional identity number
        #[arg(long = "as")]
        actor: String,
        #[command(flatten)]
        fields: RecordArgs,
    },
    /// Close a record
    Close { code: String },
    /// Show a record
    Show { code: String },
    /// Show the audit trail of a record
    Audit { code: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum CriticalFlag {
    SeverePreeclampsia,
    Eclampsia,
    SystemicSepsis,
    Chorioamnionitis,
}

#[derive(Args)]
struct RecordArgs {
    #[arg(long)]
    companion: Option<String>,
    #[arg(long)]
    gravidity: Option<u8>,
    #[arg(long)]
    parity: Option<u8>,
    #[arg(long)]
    vaginal: Option<u8>,
    #[arg(long)]
    caesarean: Option<u8>,
    #[arg(long)]
    miscarriages: Option<u8>,
    #[arg(long)]
    live_births: Option<u8>,
    /// Last menstrual period (YYYY-MM-DD)
    #[arg(long)]
    lmp: Option<NaiveDate>,
    /// Expected delivery date (YYYY-MM-DD)
    #[arg(long)]
    edd: Option<NaiveDate>,
    #[arg(long)]
    weight_kg: Option<Decimal>,
    #[arg(long)]
    height_cm: Option<Decimal>,
    /// Pathology codes; replaces the current set
    #[arg(long = "pathology", value_delimiter = ',')]
    pathologies: Option<Vec<String>>,
    /// Critical conditions; replaces the current set
    #[arg(long, value_enum, value_delimiter = ',')]
    critical: Option<Vec<CriticalFlag>>,
    #[arg(long, value_parser = parse_enum::<ScreeningResult>)]
    hiv: Option<ScreeningResult>,
    #[arg(long, value_parser = parse_enum::<ScreeningResult>)]
    gbs: Option<ScreeningResult>,
    #[arg(long, value_parser = parse_enum::<ScreeningResult>)]
    vdrl: Option<ScreeningResult>,
    #[arg(long, value_parser = parse_enum::<ScreeningResult>)]
    hepatitis_b: Option<ScreeningResult>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    relevant_history: Option<String>,
}

/// Accept the snake_case names used in the store (`fonasa_b`, `not_taken`, ...).
fn parse_enum<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    let key = value.trim().to_ascii_lowercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(key))
        .map_err(|_| format!("unrecognised value '{value}'"))
}

/// Loaded configuration, services and store for one invocation.
struct App {
    cfg: Arc<CoreConfig>,
    clock: Arc<dyn Clock>,
    backend: FileBackend,
    store: ClinicalStore,
}

impl App {
    fn open() -> anyhow::Result<Self> {
        let data_dir = data_dir_from_env_value(std::env::var("OBC_DATA_DIR").ok());
        let mut cfg = CoreConfig::new(data_dir);

        let prefix = std::env::var("OBC_PRENATAL_PREFIX").ok();
        let width = std::env::var("OBC_PRENATAL_PAD_WIDTH").ok();
        if prefix.is_some() || width.is_some() {
            let default_prefix = cfg.series(SeriesKind::Prenatal).prefix().to_string();
            let series = SeriesConfig::new(
                prefix.unwrap_or(default_prefix),
                pad_width_from_env_value(width, PRENATAL_PAD_WIDTH)?,
            )?;
            cfg = cfg.with_series(SeriesKind::Prenatal, series)?;
        }

        let backend = FileBackend::new(cfg.store_file());
        let store = backend
            .load()
            .with_context(|| format!("loading {}", backend.path().display()))?;
        tracing::debug!(data_dir = %cfg.data_dir().display(), "configuration resolved");

        Ok(Self {
            cfg: Arc::new(cfg),
            clock: Arc::new(SystemClock),
            backend,
            store,
        })
    }

    fn save(&mut self) -> anyhow::Result<()> {
        self.backend
            .save(&self.store)
            .with_context(|| format!("saving {}", self.backend.path().display()))
    }

    fn person(&self, rut: &str) -> anyhow::Result<&Person> {
        Ok(IdentityRegistry::new(&self.store).find_raw(rut)?)
    }

    fn active_role(&self, rut: &str, kind: RoleKind) -> anyhow::Result<RoleId> {
        let person = self.person(rut)?;
        RoleDirectory::new(&self.store)
            .active_role(person.id, kind)
            .map(|r| r.id)
            .ok_or_else(|| anyhow!("{} has no active {kind} role", person.identity_number))
    }

    /// The professional acting under `rut`: midwife first, then physician.
    fn author(&self, rut: &str) -> anyhow::Result<Author> {
        let role = self
            .active_role(rut, RoleKind::Midwife)
            .or_else(|_| self.active_role(rut, RoleKind::Physician))?;
        Ok(RoleDirectory::new(&self.store).author_for(role)?)
    }

    fn record(&self, code: &str) -> anyhow::Result<&ObstetricRecord> {
        Ok(self.records().find_by_code(&self.store, code)?)
    }

    fn records(&self) -> ObstetricRecordService {
        ObstetricRecordService::new(self.cfg.clone(), self.clock.clone())
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("obc=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Rut(cmd)) => run_rut(cmd),
        Some(Commands::Person(cmd)) => run_person(&mut App::open()?, cmd),
        Some(Commands::Role(cmd)) => run_role(&mut App::open()?, cmd),
        Some(Commands::Pathology(cmd)) => run_pathology(&mut App::open()?, cmd),
        Some(Commands::Record(cmd)) => run_record(&mut App::open()?, cmd),
        None => {
            println!("Use 'obc --help' for commands");
            Ok(())
        }
    }
}

fn run_rut(cmd: RutCommand) -> anyhow::Result<()> {
    match cmd {
        RutCommand::Check { rut } => match obc_rut::Rut::parse(&rut) {
            Ok(valid) => println!("valid: {valid}"),
            Err(e) => println!("invalid: {e}"),
        },
        RutCommand::Normalize { rut } => println!("{}", obc_rut::normalize(&rut)?),
        RutCommand::Format { rut } => println!("{}", obc_rut::format(&rut)?),
        RutCommand::Dv { body } => {
            let body = obc_rut::clean(&body);
            println!("{body}-{}", obc_rut::compute_check_digit(&body)?);
        }
    }
    Ok(())
}

fn run_person(app: &mut App, cmd: PersonCommand) -> anyhow::Result<()> {
    let service = PersonService::new(app.clock.clone());
    match cmd {
        PersonCommand::Register(args) => {
            let input = PersonInput {
                identity_number: args.rut,
                given_name: args.given_name,
                paternal_surname: args.paternal_surname,
                maternal_surname: args.maternal_surname,
                sex: Some(args.sex),
                birth_date: Some(args.birth_date),
                phone: args.phone,
                address: args.address,
                email: args.email,
            };
            let person = service.register(&mut app.store, input)?;
            app.save()?;
            println!(
                "Registered {} ({}) with ID: {}",
                person.full_name(),
                person.identity_number.formatted(),
                person.id
            );
        }
        PersonCommand::Find { rut } => {
            let person = app.person(&rut)?;
            let today = app.clock.today();
            println!("ID: {}", person.id);
            println!("Name: {}", person.full_name());
            println!("Identity: {}", person.identity_number.formatted());
            println!("Sex: {}", person.sex);
            match person.age_on(today) {
                Some(age) => println!("Born: {} ({age} years)", person.birth_date),
                None => println!("Born: {}", person.birth_date),
            }
            println!("Active: {}", person.active);
            for role in RoleDirectory::new(&app.store).roles_of(person.id) {
                let state = if role.active { "active" } else { "ended" };
                println!("Role: {} {} ({state})", role.kind(), role.id);
            }
        }
        PersonCommand::Deactivate { rut } => {
            let id = app.person(&rut)?.id;
            service.deactivate(&mut app.store, id)?;
            app.save()?;
            println!("Deactivated person {id}");
        }
    }
    Ok(())
}

fn run_role(app: &mut App, cmd: RoleCommand) -> anyhow::Result<()> {
    let binder = RoleBinder::new(app.cfg.clone(), app.clock.clone());

    let (rut, data) = match cmd {
        RoleCommand::Unbind { role_id } => {
            let role = binder.unbind(&mut app.store, RoleId::parse(&role_id)?)?;
            app.save()?;
            println!("Ended {} role {}", role.kind(), role.id);
            return Ok(());
        }
        RoleCommand::BindPatient {
            rut,
            civil_status,
            health_plan,
            parity,
            bmi,
            prenatal_control,
            companion,
            emergency_contact,
        } => (
            rut,
            RoleData::Patient(PatientRole {
                civil_status,
                health_plan,
                parity: parity.as_deref().and_then(NonEmptyText::optional),
                bmi,
                prenatal_control,
                companion: NonEmptyText::optional(&companion),
                emergency_contact: NonEmptyText::optional(&emergency_contact),
            }),
        ),
        RoleCommand::BindPhysician {
            rut,
            specialty,
            professional,
        } => (
            rut,
            RoleData::Physician(PhysicianRole {
                specialty,
                registration_number: required(&professional.registration, "registration")?,
                years_of_experience: professional.years,
                shift: professional.shift,
            }),
        ),
        RoleCommand::BindMidwife {
            rut,
            specialty,
            professional,
        } => (
            rut,
            RoleData::Midwife(MidwifeRole {
                specialty,
                registration_number: required(&professional.registration, "registration")?,
                years_of_experience: professional.years,
                shift: professional.shift,
            }),
        ),
        RoleCommand::BindTens {
            rut,
            level,
            years,
            shift,
            certification,
        } => (
            rut,
            RoleData::NursingTechnician(NursingTechnicianRole {
                level,
                years_of_experience: years,
                shift,
                certification,
            }),
        ),
    };

    let person = app.person(&rut)?.id;
    let role = binder.bind(&mut app.store, person, data)?;
    app.save()?;
    println!("Bound {} role with ID: {}", role.kind(), role.id);
    Ok(())
}

fn required(value: &str, what: &str) -> anyhow::Result<NonEmptyText> {
    NonEmptyText::new(value).map_err(|e| anyhow!("{what}: {e}"))
}

fn run_pathology(app: &mut App, cmd: PathologyCommand) -> anyhow::Result<()> {
    let service = PathologyService::new();
    match cmd {
        PathologyCommand::Add {
            name,
            code,
            risk,
            description,
            follow_up,
        } => {
            let entry = service.add(
                &mut app.store,
                PathologyInput {
                    name,
                    classification_code: code,
                    risk_level: risk,
                    description,
                    follow_up_protocol: follow_up,
                },
            )?;
            app.save()?;
            println!("Added {} {} ({})", entry.classification_code, entry.name, entry.risk_level);
        }
        PathologyCommand::List => {
            let entries = service.list_active(&app.store);
            if entries.is_empty() {
                println!("No pathologies found.");
            }
            for entry in entries {
                println!("{}\t{}\t{}", entry.classification_code, entry.name, entry.risk_level);
            }
        }
        PathologyCommand::Deactivate { code } => {
            let id = service.find_by_code(&app.store, &code)?.id;
            let entry = service.deactivate(&mut app.store, id)?;
            app.save()?;
            println!("Deactivated {}", entry.classification_code);
        }
    }
    Ok(())
}

fn run_record(app: &mut App, cmd: RecordCommand) -> anyhow::Result<()> {
    let service = app.records();
    match cmd {
        RecordCommand::Create {
            patient,
            actor,
            fields,
        } => {
            let patient_role = app.active_role(&patient, RoleKind::Patient)?;
            let midwife_role = app.active_role(&actor, RoleKind::Midwife)?;
            let author = app.author(&actor)?;

            let mut base = RecordFields {
                midwife_id: Some(midwife_role),
                ..Default::default()
            };
            apply_record_args(&app.store, &mut base, fields)?;

            let record = service.create(&mut app.store, patient_role, base, &author)?;
            app.save()?;
            print_record(&record);
        }
        RecordCommand::Amend {
            code,
            actor,
            fields,
        } => {
            let author = app.author(&actor)?;
            let record = app.record(&code)?;
            let id = record.id;
            let mut next = record.fields.clone();
            apply_record_args(&app.store, &mut next, fields)?;

            let amendment = service.amend(&mut app.store, id, next, &author)?;
            app.save()?;
            print_record(&amendment.record);
            match amendment.audit {
                Some(entry) => println!("Audit: {} field(s) changed", entry.changed_fields.len()),
                None => println!("Audit: no tracked field changed"),
            }
        }
        RecordCommand::Close { code } => {
            let id = app.record(&code)?.id;
            let record = service.close(&mut app.store, id)?;
            app.save()?;
            println!("Closed {}", record.code.as_deref().unwrap_or("-"));
        }
        RecordCommand::Show { code } => print_record(app.record(&code)?),
        RecordCommand::Audit { code } => {
            let id = app.record(&code)?.id;
            let entries = service.audit_for(&app.store, id)?;
            if entries.is_empty() {
                println!("No audit entries.");
            }
            for entry in entries {
                println!("{} by {}", entry.recorded_at.to_rfc3339(), entry.actor);
                for line in entry.diff.lines() {
                    println!("  {line}");
                }
            }
        }
    }
    Ok(())
}

fn apply_record_args(
    store: &ClinicalStore,
    fields: &mut RecordFields,
    args: RecordArgs,
) -> anyhow::Result<()> {
    if let Some(companion) = args.companion {
        fields.companion_name = NonEmptyText::optional(&companion);
    }

    let history = &mut fields.history;
    for (slot, value) in [
        (&mut history.gravidity, args.gravidity),
        (&mut history.parity, args.parity),
        (&mut history.vaginal, args.vaginal),
        (&mut history.caesarean, args.caesarean),
        (&mut history.miscarriages, args.miscarriages),
        (&mut history.live_births, args.live_births),
    ] {
        if let Some(value) = value {
            *slot = value;
        }
    }

    if args.lmp.is_some() {
        fields.last_menstrual_period = args.lmp;
    }
    if args.edd.is_some() {
        fields.expected_delivery_date = args.edd;
    }
    if args.weight_kg.is_some() {
        fields.weight_kg = args.weight_kg;
    }
    if args.height_cm.is_some() {
        fields.height_cm = args.height_cm;
    }

    if let Some(codes) = args.pathologies {
        let service = PathologyService::new();
        fields.pathology_ids = codes
            .iter()
            .filter(|c| !c.trim().is_empty())
            .map(|c| service.find_by_code(store, c).map(|p| p.id))
            .collect::<Result<_, _>>()?;
    }

    if let Some(flags) = args.critical {
        let critical = &mut fields.critical;
        critical.severe_preeclampsia = flags.contains(&CriticalFlag::SeverePreeclampsia);
        critical.eclampsia = flags.contains(&CriticalFlag::Eclampsia);
        critical.systemic_sepsis = flags.contains(&CriticalFlag::SystemicSepsis);
        critical.chorioamnionitis = flags.contains(&CriticalFlag::Chorioamnionitis);
    }

    let screenings = &mut fields.screenings;
    for (slot, value) in [
        (&mut screenings.hiv, args.hiv),
        (&mut screenings.group_b_streptococcus, args.gbs),
        (&mut screenings.vdrl, args.vdrl),
        (&mut screenings.hepatitis_b, args.hepatitis_b),
    ] {
        if let Some(value) = value {
            *slot = value;
        }
    }

    if let Some(notes) = args.notes {
        fields.general_notes = NonEmptyText::optional(&notes);
    }
    if let Some(history) = args.relevant_history {
        fields.relevant_history = NonEmptyText::optional(&history);
    }
    Ok(())
}

fn print_record(record: &ObstetricRecord) {
    println!("Code: {}", record.code.as_deref().unwrap_or("-"));
    println!("ID: {}", record.id);
    println!("State: {}", record.state());
    println!("History: {}", record.fields.history.formula());
    println!(
        "Gestational age: {}",
        gestational_age_text(record.derived.gestational_age)
    );
    match record.derived.bmi {
        Some(bmi) => {
            let class = BmiClass::classify(bmi);
            println!(
                "BMI: {bmi} ({class}, recommended gain {})",
                class.weight_gain_recommendation()
            );
        }
        None => println!("BMI: not recorded"),
    }
    println!("Pathologies:");
    for line in record.derived.pathology_description.lines() {
        println!("  {line}");
    }
    println!("Critical conditions: {}", record.fields.critical);
    println!("Screenings: {}", record.fields.screenings);
    if !record.screenings_complete() {
        println!("  (screening incomplete)");
    }
}
