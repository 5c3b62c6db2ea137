use crate::filter::{FilterPredicate, Matcher};
use crate::record::{FieldKind, FieldSpec, SelectOption};
use crate::table::RowActionKind;
use serde::Serialize;

/// Backend routes for one resource. `{scope}` and `{id}` are substituted
/// (url-encoded) when a call is made. A list route without `{scope}` lists
/// the same rows whatever school is selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    pub list: String,
    pub create: Option<String>,
    pub update: Option<String>,
    pub delete: Option<String>,
    /// Status-change route used by withdraw/reinstate.
    pub transition: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum ListRoute {
    /// `/{resource}/school/{scope}`
    School,
    /// `/{resource}/getAll/{scope}`
    GetAll,
}

impl Endpoints {
    pub fn conventional(resource: &str, list: ListRoute) -> Self {
        let list = match list {
            ListRoute::School => format!("/{resource}/school/{{scope}}"),
            ListRoute::GetAll => format!("/{resource}/getAll/{{scope}}"),
        };
        Self {
            list,
            create: Some(format!("/{resource}/create")),
            update: Some(format!("/{resource}/update/{{id}}")),
            delete: Some(format!("/{resource}/delete/{{id}}")),
            transition: None,
        }
    }

    pub fn is_scoped(&self) -> bool {
        self.list.contains("{scope}")
    }

    fn list_at(mut self, path: &str) -> Self {
        self.list = path.to_string();
        self
    }

    fn delete_at(mut self, path: &str) -> Self {
        self.delete = Some(path.to_string());
        self
    }

    fn transition_at(mut self, path: &str) -> Self {
        self.transition = Some(path.to_string());
        self
    }

    fn read_only(mut self) -> Self {
        self.create = None;
        self.update = None;
        self
    }

    pub fn expand(template: &str, scope: Option<&str>, id: Option<&str>) -> String {
        let mut out = template.to_string();
        if let Some(scope) = scope {
            out = out.replace("{scope}", &urlencoding::encode(scope));
        }
        if let Some(id) = id {
            out = out.replace("{id}", &urlencoding::encode(id));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnHeader {
    pub key: String,
    pub label: String,
}

/// A search input offered above the table. The presentation layer turns the
/// typed value into a predicate via [`SearchField::predicate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchField {
    pub field_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub or_fields: Vec<String>,
    pub label: String,
    pub kind: FieldKind,
    pub matcher: Matcher,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

impl SearchField {
    fn text(field_id: &str, label: &str) -> Self {
        Self {
            field_id: field_id.to_string(),
            or_fields: Vec::new(),
            label: label.to_string(),
            kind: FieldKind::Text,
            matcher: Matcher::Substring,
            options: Vec::new(),
        }
    }

    fn select(field_id: &str, label: &str, options: Vec<SelectOption>) -> Self {
        Self {
            kind: FieldKind::Select,
            matcher: Matcher::Equals,
            options,
            ..Self::text(field_id, label)
        }
    }

    fn or_field(mut self, field_id: &str) -> Self {
        self.or_fields.push(field_id.to_string());
        self
    }

    pub fn predicate(&self, value: &str) -> FilterPredicate {
        let base = match self.matcher {
            Matcher::Substring => FilterPredicate::substring(&self.field_id, value),
            Matcher::Equals => FilterPredicate::equals(&self.field_id, value),
        };
        self.or_fields.iter().fold(base, |p, f| p.or_field(f))
    }
}

/// Everything that distinguishes one CRUD screen from another.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDef {
    pub name: String,
    pub title: String,
    /// Singular noun used in activity-log lines.
    pub noun: String,
    pub endpoints: Endpoints,
    pub id_field: String,
    /// Payload key that carries the active scope id on create/update.
    pub scope_field: Option<String>,
    pub columns: Vec<FieldSpec>,
    pub form: Vec<FieldSpec>,
    pub search: Vec<SearchField>,
    pub row_actions: Vec<RowActionKind>,
    pub export_headers: Vec<ColumnHeader>,
    pub export_name: String,
    pub activity_log: bool,
    pub empty_message: String,
}

impl ResourceDef {
    pub fn can_create(&self) -> bool {
        self.endpoints.create.is_some() && !self.form.is_empty()
    }

    pub fn offers(&self, kind: RowActionKind) -> bool {
        self.row_actions.contains(&kind)
    }

    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.form
            .iter()
            .chain(self.columns.iter())
            .find(|f| f.id == id)
    }
}

fn headers(pairs: &[(&str, &str)]) -> Vec<ColumnHeader> {
    pairs
        .iter()
        .map(|(key, label)| ColumnHeader {
            key: key.to_string(),
            label: label.to_string(),
        })
        .collect()
}

fn gender_options() -> Vec<SelectOption> {
    vec![
        SelectOption::new("female", "female"),
        SelectOption::new("male", "male"),
        SelectOption::new("other", "other"),
    ]
}

fn person_columns(id_label: &str) -> Vec<FieldSpec> {
    vec![
        FieldSpec::text("userID", id_label),
        FieldSpec::text("name", "Name"),
        FieldSpec::text("middlename", "Middle Name"),
        FieldSpec::text("surname", "Last Name"),
    ]
}

fn student_export() -> Vec<ColumnHeader> {
    headers(&[
        ("userID", "UserID"),
        ("name", "Name"),
        ("middlename", "Middle Name"),
        ("surname", "Surname"),
        ("gender", "Gender"),
        ("status", "Status"),
        ("classID", "Class"),
    ])
}

fn student_search() -> Vec<SearchField> {
    vec![
        SearchField::text("userID", "Search by Student ID"),
        SearchField::text("name", "Search by Name").or_field("surname"),
        SearchField::text("classID", "Search by Class"),
    ]
}

fn students() -> ResourceDef {
    let mut columns = person_columns("StudentID");
    columns.extend([
        FieldSpec::text("status", "Status"),
        FieldSpec::text("classID", "Class"),
        FieldSpec::text("gender", "Gender"),
    ]);
    let mut search = student_search();
    search.extend([
        SearchField::select("gender", "Search by Gender", gender_options()),
        SearchField::text("status", "Search by Status"),
    ]);
    ResourceDef {
        name: "students".into(),
        title: "All Students".into(),
        noun: "student".into(),
        endpoints: Endpoints::conventional("students", ListRoute::School)
            .delete_at("/user/delete/{id}")
            .transition_at("/students/update/{id}"),
        id_field: "userID".into(),
        scope_field: Some("user_Id".into()),
        columns,
        form: vec![
            FieldSpec::text("name", "Name").required(),
            FieldSpec::text("middlename", "Middle Name"),
            FieldSpec::text("surname", "Last Name").required(),
            FieldSpec::select("gender", "Gender", gender_options()).required(),
            FieldSpec::text("classID", "Class"),
            FieldSpec::text("status", "Status"),
            FieldSpec::date("dateofBirth", "Date of Birth"),
        ],
        search,
        row_actions: vec![
            RowActionKind::View,
            RowActionKind::Edit,
            RowActionKind::Delete,
            RowActionKind::Withdraw,
        ],
        export_headers: student_export(),
        export_name: "Allstudents".into(),
        activity_log: false,
        empty_message: "No students found for the selected criteria".into(),
    }
}

fn withdrawn_students() -> ResourceDef {
    let mut columns = person_columns("StudentID");
    columns.extend([
        FieldSpec::text("classID", "Class"),
        FieldSpec::text("gender", "Gender"),
    ]);
    let mut search = student_search();
    search[2] = SearchField::text("section", "Search by Section");
    ResourceDef {
        name: "withdrawn-students".into(),
        title: "Withdrawn Students".into(),
        noun: "student".into(),
        endpoints: Endpoints::conventional("students", ListRoute::School)
            .list_at("/students/withdraw/{scope}")
            .delete_at("/user/delete/{id}")
            .transition_at("/students/update/{id}")
            .read_only(),
        id_field: "userID".into(),
        scope_field: None,
        columns,
        form: Vec::new(),
        search,
        row_actions: vec![
            RowActionKind::View,
            RowActionKind::Delete,
            RowActionKind::Reinstate,
        ],
        export_headers: student_export(),
        export_name: "WithdrawnStudents".into(),
        activity_log: false,
        empty_message: "No withdrawn students found".into(),
    }
}

fn past_students() -> ResourceDef {
    let mut columns = person_columns("StudentID");
    columns.extend([
        FieldSpec::text("year", "Graduation Year"),
        FieldSpec::text("classID", "Class"),
        FieldSpec::text("gender", "Gender"),
    ]);
    let mut search = student_search();
    search[2] = SearchField::text("year", "Search by Academic Year");
    ResourceDef {
        name: "past-students".into(),
        title: "Past Students".into(),
        noun: "student".into(),
        endpoints: Endpoints::conventional("students", ListRoute::School)
            .list_at("/students/past/school/{scope}")
            .delete_at("/user/delete/{id}")
            .read_only(),
        id_field: "userID".into(),
        scope_field: None,
        columns,
        form: Vec::new(),
        search,
        row_actions: vec![RowActionKind::View, RowActionKind::Delete],
        export_headers: student_export(),
        export_name: "PastStudents".into(),
        activity_log: false,
        empty_message: "No past students found".into(),
    }
}

fn staff() -> ResourceDef {
    let mut columns = person_columns("Teacher ID");
    columns.extend([
        FieldSpec::text("position", "Position"),
        FieldSpec::text("gender", "Gender"),
    ]);
    ResourceDef {
        name: "staff".into(),
        title: "All Staff".into(),
        noun: "staff member".into(),
        endpoints: Endpoints::conventional("teachers", ListRoute::School)
            .delete_at("/user/delete/{id}")
            .transition_at("/teachers/update/{id}"),
        id_field: "userID".into(),
        scope_field: Some("user_Id".into()),
        columns,
        form: vec![
            FieldSpec::text("name", "Name").required(),
            FieldSpec::text("middlename", "Middle Name"),
            FieldSpec::text("surname", "Last Name").required(),
            FieldSpec::text("position", "Position"),
            FieldSpec::select("gender", "Gender", gender_options()).required(),
        ],
        search: vec![
            SearchField::text("name", "Search by Name").or_field("surname"),
            SearchField::text("userID", "Search by UserID"),
        ],
        row_actions: vec![
            RowActionKind::View,
            RowActionKind::Edit,
            RowActionKind::Delete,
            RowActionKind::Withdraw,
        ],
        export_headers: headers(&[
            ("userID", "UserID"),
            ("name", "Name"),
            ("middlename", "Middle Name"),
            ("surname", "Surname"),
            ("gender", "Gender"),
            ("position", "Position"),
        ]),
        export_name: "Allstaff".into(),
        activity_log: false,
        empty_message: "No staff found for the selected criteria".into(),
    }
}

/// Departments, campuses, sections and dormitories share one shape: a
/// named entity listed per school with an activity log entry per change.
fn school_unit(name: &str, title: &str, noun: &str, extra: Option<(&str, &str)>) -> ResourceDef {
    let mut columns = vec![FieldSpec::text("name", "Name")];
    let mut form = vec![FieldSpec::text("name", "Name").required()];
    let mut search = SearchField::text("name", "Search Name");
    let mut export = vec![("name", "Name")];
    if let Some((id, label)) = extra {
        columns.push(FieldSpec::text(id, label));
        form.push(FieldSpec::text(id, label));
        search = search.or_field(id);
        export.push((id, label));
    }
    columns.push(FieldSpec::date("createdAt", "Created At"));
    export.push(("createdAt", "Created At"));
    ResourceDef {
        name: name.into(),
        title: title.into(),
        noun: noun.into(),
        endpoints: Endpoints::conventional(name, ListRoute::School),
        id_field: "_id".into(),
        scope_field: Some("user_Id".into()),
        columns,
        form,
        search: vec![search],
        row_actions: vec![RowActionKind::Edit, RowActionKind::Delete],
        export_headers: headers(&export),
        export_name: title.replace(' ', ""),
        activity_log: true,
        empty_message: format!("No {name} found for this school"),
    }
}

fn subjects() -> ResourceDef {
    ResourceDef {
        name: "subjects".into(),
        title: "Subjects".into(),
        noun: "subject".into(),
        endpoints: Endpoints::conventional("subjects", ListRoute::GetAll),
        id_field: "_id".into(),
        scope_field: Some("user_Id".into()),
        columns: vec![
            FieldSpec::text("subjectName", "Subject Name"),
            FieldSpec::text("subjectCode", "Subject Code"),
            FieldSpec::text("description", "Description"),
        ],
        form: vec![
            FieldSpec::text("subjectName", "Subject Name").required(),
            FieldSpec::text("subjectCode", "Subject Code").required(),
            FieldSpec::text("description", "Description"),
        ],
        search: vec![SearchField::text("subjectName", "Search Subject").or_field("subjectCode")],
        row_actions: vec![RowActionKind::View, RowActionKind::Edit, RowActionKind::Delete],
        export_headers: headers(&[
            ("subjectName", "Subject Name"),
            ("subjectCode", "Subject Code"),
            ("description", "Description"),
        ]),
        export_name: "Subjects".into(),
        activity_log: false,
        empty_message: "No subjects found".into(),
    }
}

fn subject_groups() -> ResourceDef {
    let status = vec![
        SelectOption::new("Active", "Active"),
        SelectOption::new("Inactive", "Inactive"),
    ];
    let mut endpoints = Endpoints::conventional("subject-groups", ListRoute::School)
        .list_at("/subject-groups/group/{scope}");
    endpoints.create = Some("/subject-groups/add".into());
    ResourceDef {
        name: "subject-groups".into(),
        title: "Subject Groups".into(),
        noun: "subject group".into(),
        endpoints,
        id_field: "_id".into(),
        scope_field: Some("user_Id".into()),
        columns: vec![
            FieldSpec::text("group_name", "Group Name"),
            FieldSpec::text("description", "Description"),
            FieldSpec::text("status", "Status"),
            FieldSpec::text("subjectIds", "Subjects"),
        ],
        form: vec![
            FieldSpec::text("group_name", "Group Name").required(),
            FieldSpec::text("description", "Description"),
            FieldSpec::select("status", "Status", status.clone()),
            // A list of subject ids.
            FieldSpec::text("subjectIds", "Subjects"),
        ],
        search: vec![
            SearchField::text("group_name", "Search Group"),
            SearchField::select("status", "Search by Status", status),
        ],
        row_actions: vec![RowActionKind::Edit, RowActionKind::Delete],
        export_headers: headers(&[
            ("group_name", "Group Name"),
            ("description", "Description"),
            ("status", "Status"),
            ("subjectIds", "Subjects"),
        ]),
        export_name: "SubjectGroups".into(),
        activity_log: false,
        empty_message: "No subject groups found".into(),
    }
}

/// Every school account on the platform. Not tied to a selected school.
fn admins() -> ResourceDef {
    let mut endpoints = Endpoints::conventional("school", ListRoute::School).list_at("/getAlladmin");
    endpoints.delete = None;
    ResourceDef {
        name: "admins".into(),
        title: "Schools".into(),
        noun: "school".into(),
        endpoints,
        id_field: "_id".into(),
        scope_field: None,
        columns: vec![
            FieldSpec::text("fullName", "Full Name"),
            FieldSpec::text("name", "School Name"),
            FieldSpec::text("email", "Email"),
            FieldSpec::text("telephone", "Telephone"),
            FieldSpec::text("address", "Address"),
            FieldSpec::text("role", "Role"),
        ],
        form: vec![
            FieldSpec::text("fullName", "Full Name"),
            FieldSpec::text("name", "School Name").required(),
            FieldSpec::text("email", "Email").required(),
            FieldSpec::text("userID", "User ID"),
            FieldSpec::text("telephone", "Telephone"),
            FieldSpec::text("address", "Address"),
            FieldSpec::text("motto", "Motto"),
            FieldSpec::text("password", "Password"),
        ],
        search: vec![SearchField::text("name", "Search School").or_field("fullName")],
        row_actions: vec![RowActionKind::View, RowActionKind::Edit],
        export_headers: headers(&[
            ("fullName", "Full Name"),
            ("name", "School Name"),
            ("email", "Email"),
            ("telephone", "Telephone"),
            ("address", "Address"),
            ("role", "Role"),
        ]),
        export_name: "Schools".into(),
        activity_log: false,
        empty_message: "No schools found".into(),
    }
}

pub fn catalog() -> Vec<ResourceDef> {
    vec![
        students(),
        withdrawn_students(),
        past_students(),
        staff(),
        school_unit(
            "departments",
            "Departments",
            "department",
            Some(("description", "Description")),
        ),
        school_unit("campuses", "Campuses", "campus", Some(("location", "Location"))),
        school_unit("sections", "Sections", "section", None),
        school_unit("dormitories", "Dormitories", "dormitory", None),
        subjects(),
        subject_groups(),
        admins(),
    ]
}

pub fn find(name: &str) -> Option<ResourceDef> {
    catalog().into_iter().find(|r| r.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_names_are_unique_and_well_formed() {
        let all = catalog();
        let names: HashSet<_> = all.iter().map(|r| r.name.clone()).collect();
        assert_eq!(names.len(), all.len());
        for r in &all {
            assert_eq!(r.endpoints.is_scoped(), r.name != "admins", "{} list route", r.name);
            if r.offers(RowActionKind::Delete) {
                assert!(r.endpoints.delete.is_some(), "{} delete", r.name);
            }
            for route in [&r.endpoints.update, &r.endpoints.delete, &r.endpoints.transition]
                .into_iter()
                .flatten()
            {
                assert!(route.contains("{id}"), "{} route {route}", r.name);
            }
            if r.offers(RowActionKind::Withdraw) || r.offers(RowActionKind::Reinstate) {
                assert!(r.endpoints.transition.is_some(), "{} transition", r.name);
            }
            if r.offers(RowActionKind::Edit) {
                assert!(r.endpoints.update.is_some() && !r.form.is_empty(), "{} edit", r.name);
            }
        }
    }

    #[test]
    fn endpoints_expand_and_encode() {
        let e = Endpoints::conventional("departments", ListRoute::School);
        assert_eq!(
            Endpoints::expand(&e.list, Some("sch 1"), None),
            "/departments/school/sch%201"
        );
        assert_eq!(
            Endpoints::expand(e.delete.as_deref().unwrap_or_default(), None, Some("d/9")),
            "/departments/delete/d%2F9"
        );
        let s = Endpoints::conventional("subjects", ListRoute::GetAll);
        assert_eq!(s.list, "/subjects/getAll/{scope}");
        let admins = find("admins").expect("admins");
        assert_eq!(Endpoints::expand(&admins.endpoints.list, None, None), "/getAlladmin");
        assert_eq!(admins.endpoints.update.as_deref(), Some("/school/update/{id}"));
        let groups = find("subject-groups").expect("groups");
        assert_eq!(groups.endpoints.create.as_deref(), Some("/subject-groups/add"));
        assert_eq!(
            Endpoints::expand(&groups.endpoints.list, Some("sch1"), None),
            "/subject-groups/group/sch1"
        );
    }

    #[test]
    fn search_field_builds_predicate() {
        let students = find("students").expect("students");
        let p = students.search[1].predicate("ban");
        assert_eq!(p.field_id, "name");
        assert_eq!(p.or_fields, vec!["surname".to_string()]);
        assert_eq!(p.matcher, Matcher::Substring);
        let gender = students
            .search
            .iter()
            .find(|s| s.field_id == "gender")
            .expect("gender search");
        assert_eq!(gender.matcher, Matcher::Equals);
    }

    #[test]
    fn roster_exports_use_the_table_field_ids() {
        for name in ["students", "withdrawn-students", "past-students", "staff"] {
            let def = find(name).expect(name);
            let middle = def
                .export_headers
                .iter()
                .find(|h| h.label == "Middle Name")
                .expect("middle name header");
            assert!(def.columns.iter().any(|c| c.id == middle.key), "{name} export {}", middle.key);
        }
    }

    #[test]
    fn read_only_rosters_cannot_create() {
        assert!(!find("withdrawn-students").expect("withdrawn").can_create());
        assert!(!find("past-students").expect("past").can_create());
        assert!(find("departments").expect("departments").can_create());
        assert!(find("nope").is_none());
    }
}
